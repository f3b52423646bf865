//! Импорт ключа: определение формата, расшифровка и отчёт

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::error::Result;
use crate::pipeline;

use super::{print_public_info, read_key_text, unlock};

#[derive(Debug, Args)]
pub struct ImportArgs {
    /// Файл ключа (`-` для stdin)
    pub file: PathBuf,

    /// Заменить комментарий ключа
    #[arg(short = 'C', long)]
    pub comment: Option<String>,

    /// Вывести отчёт в JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: ImportArgs) -> Result<()> {
    let text = read_key_text(&args.file)?;
    let comment = args.comment.as_deref();

    let (report, _) = unlock(|passphrase| pipeline::import(&text, passphrase, comment))?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    if report.is_private_key {
        println!(
            "{} закрытый, формат {}",
            "Ключ:".bold(),
            report
                .detected_format
                .map(|f| f.to_string())
                .unwrap_or_default()
        );
        if report.passphrase_protected {
            println!("{} {}", "Шифр:".bold(), report.detected_cipher);
        } else {
            println!("{} {}", "Шифр:".bold(), "нет".yellow());
        }
    } else {
        println!("{} публичный", "Ключ:".bold());
    }
    print_public_info(&report.public);

    Ok(())
}
