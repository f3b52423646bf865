use clap::{Parser, Subcommand};
use colored::Colorize;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sshkey_codec::cli;
use sshkey_codec::config::{self, Settings};
use sshkey_codec::Result;

#[derive(Parser)]
#[command(name = "sshkey-codec")]
#[command(author = "Oleg")]
#[command(version = "0.1.0")]
#[command(about = "Генерация, импорт и преобразование SSH-ключей", long_about = None)]
struct Cli {
    /// Путь к файлу настроек
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    /// Подробный вывод в stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Сгенерировать новую пару ключей
    Generate(cli::generate::GenerateArgs),

    /// Импортировать ключ и показать сведения о нём
    Import(cli::import::ImportArgs),

    /// Преобразовать ключ в другой формат
    Convert(cli::convert::ConvertArgs),

    /// Показать формат и шифр ключа без расшифровки
    Inspect(cli::inspect::InspectArgs),

    /// Управление настройками
    Config {
        #[command(subcommand)]
        action: ConfigCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Показать текущие настройки
    Show,
    /// Создать файл настроек со значениями по умолчанию
    Init,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("sshkey_codec=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("sshkey_codec=warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli);

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "Ошибка:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<()> {
    let path = match cli.config {
        Some(path) => path,
        None => config::default_config_path()?,
    };

    if let Commands::Config { action: ConfigCommands::Init } = cli.command {
        return cli::config::init(&path);
    }

    let settings: Settings = config::load_settings(&path)?;
    tracing::debug!(path = %path.display(), "settings loaded");

    match cli.command {
        Commands::Generate(args) => cli::generate::run(args, &settings),
        Commands::Import(args) => cli::import::run(args),
        Commands::Convert(args) => cli::convert::run(args, &settings),
        Commands::Inspect(args) => cli::inspect::run(args),
        Commands::Config { action } => match action {
            ConfigCommands::Show => cli::config::show(&path, &settings),
            ConfigCommands::Init => cli::config::init(&path),
        },
    }
}
