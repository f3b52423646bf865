//! Просмотр ключа без парольной фразы

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::error::Result;
use crate::pipeline;

use super::{print_public_info, read_key_text};

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Файл ключа (`-` для stdin)
    pub file: PathBuf,

    /// Вывести отчёт в JSON
    #[arg(long)]
    pub json: bool,
}

pub fn run(args: InspectArgs) -> Result<()> {
    let text = read_key_text(&args.file)?;
    let report = pipeline::inspect(&text)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    println!();
    if !report.is_private_key {
        println!("{} публичный", "Ключ:".bold());
    } else {
        if let Some(format) = report.format {
            println!("{} {}", "Формат:".bold(), format);
        }
        let cipher = report
            .cipher_name
            .clone()
            .unwrap_or_else(|| report.cipher.to_string());
        println!("{} {}", "Шифр:".bold(), cipher);
        if let Some(kdf) = &report.kdf {
            match report.kdf_rounds {
                Some(rounds) => println!("{} {} ({} раундов)", "KDF:".bold(), kdf, rounds),
                None => println!("{} {}", "KDF:".bold(), kdf),
            }
        }
        if report.passphrase_required {
            println!("{}", "Для расшифровки нужна парольная фраза.".yellow());
        }
    }

    if let Some(public) = &report.public {
        println!();
        print_public_info(public);
    }

    Ok(())
}
