//! Генерация новой пары ключей

use std::path::PathBuf;

use clap::Args;
use colored::Colorize;

use crate::config::{self, Settings};
use crate::crypto::CipherKind;
use crate::error::Result;
use crate::format::KeyFormat;
use crate::keys::KeyAlgorithm;
use crate::pipeline::{self, ExportOptions};

use super::{confirm, done, print_public_info, prompt_new_passphrase, step};

#[derive(Debug, Args)]
pub struct GenerateArgs {
    /// Алгоритм ключа
    #[arg(short, long, value_enum)]
    pub algorithm: Option<KeyAlgorithm>,

    /// Размер ключа RSA в битах
    #[arg(short, long)]
    pub bits: Option<usize>,

    /// Формат закрытого ключа
    #[arg(short, long, value_enum)]
    pub format: Option<KeyFormat>,

    /// Шифр для ключа OpenSSH с парольной фразой
    #[arg(short, long, value_enum)]
    pub cipher: Option<CipherKind>,

    /// Комментарий к ключу
    #[arg(short = 'C', long)]
    pub comment: Option<String>,

    /// Не запрашивать парольную фразу
    #[arg(long)]
    pub no_passphrase: bool,

    /// Файл для закрытого ключа (публичный будет записан в FILE.pub)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,
}

pub fn run(args: GenerateArgs, settings: &Settings) -> Result<()> {
    let algorithm = args.algorithm.unwrap_or(settings.default_algorithm);
    let format = args.format.unwrap_or(settings.default_format);

    if let Some(path) = &args.output {
        if path.exists() && !confirm(&format!("Файл {} существует. Перезаписать?", path.display())) {
            println!("Отменено.");
            return Ok(());
        }
    }

    // Only the OpenSSH container can carry a passphrase
    let passphrase = if args.no_passphrase || format != KeyFormat::OpenSsh {
        None
    } else {
        let passphrase = prompt_new_passphrase()?;
        println!();
        passphrase
    };

    let options = ExportOptions {
        format,
        passphrase,
        cipher: args.cipher.unwrap_or(settings.default_cipher),
        comment: settings.comment_or_default(args.comment),
    };

    step(&format!("Генерация ключа {}... ", algorithm))?;
    let key = pipeline::generate(algorithm, args.bits.unwrap_or(settings.rsa_bits), &options)?;
    done();

    match &args.output {
        Some(path) => {
            step("Сохранение ключей... ")?;
            config::write_private_file(path, key.private_key.as_bytes())?;
            let public_path = config::public_key_path(path);
            config::write_public_file(&public_path, &key.public.public_key)?;
            done();

            println!();
            println!("Закрытый ключ: {}", path.display().to_string().cyan());
            println!("Публичный ключ: {}", public_path.display().to_string().cyan());
        }
        None => {
            println!();
            print!("{}", key.private_key.as_str());
        }
    }

    println!();
    println!(
        "{} {}, шифр {}",
        "Формат:".bold(),
        key.format,
        key.cipher
    );
    print_public_info(&key.public);

    Ok(())
}
