//! Преобразование ключа в другой формат или под другую парольную фразу

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::config::{self, Settings};
use crate::crypto::CipherKind;
use crate::error::Result;
use crate::format::KeyFormat;
use crate::pipeline::{self, ExportOptions};

use super::{confirm, done, print_public_info, prompt_new_passphrase, read_key_text, step, unlock};

#[derive(Debug, Args)]
pub struct ConvertArgs {
    /// Исходный файл ключа (`-` для stdin)
    pub file: PathBuf,

    /// Формат результата
    #[arg(short, long, value_enum)]
    pub format: KeyFormat,

    /// Шифр для ключа OpenSSH с парольной фразой
    #[arg(short, long, value_enum)]
    pub cipher: Option<CipherKind>,

    /// Новый комментарий
    #[arg(short = 'C', long)]
    pub comment: Option<String>,

    /// Сохранить результат без шифрования
    #[arg(long)]
    pub no_passphrase: bool,

    /// Файл для результата (по умолчанию stdout)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: ConvertArgs, settings: &Settings) -> Result<()> {
    let text = read_key_text(&args.file)?;

    if let Some(path) = &args.output {
        if path.exists() && !confirm(&format!("Файл {} существует. Перезаписать?", path.display())) {
            println!("Отменено.");
            return Ok(());
        }
    }

    // Unlock first so the new passphrase is only asked for a usable key
    let (_, current) = unlock(|passphrase| pipeline::load_private_key(&text, passphrase))?;

    let passphrase = if args.no_passphrase || args.format != KeyFormat::OpenSsh {
        None
    } else {
        println!();
        prompt_new_passphrase()?
    };

    let options = ExportOptions {
        format: args.format,
        passphrase,
        cipher: args.cipher.unwrap_or(settings.default_cipher),
        comment: args.comment,
    };

    step("Преобразование ключа... ")?;
    let key = pipeline::convert(&text, current.as_ref(), &options)?;
    done();

    match &args.output {
        Some(path) => {
            config::write_private_file(path, key.private_key.as_bytes())?;
            println!("Закрытый ключ: {}", path.display().to_string().cyan());
        }
        None => {
            println!();
            print!("{}", key.private_key.as_str());
        }
    }

    println!();
    println!("{} {}, шифр {}", "Формат:".bold(), key.format, key.cipher);
    print_public_info(&key.public);

    Ok(())
}
