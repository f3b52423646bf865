//! Просмотр и создание файла настроек

use std::path::Path;

use colored::Colorize;

use crate::config::{self, Settings};
use crate::error::Result;

use super::confirm;

pub fn show(path: &Path, settings: &Settings) -> Result<()> {
    let origin = if path.exists() {
        "".normal()
    } else {
        " (файл отсутствует, значения по умолчанию)".dimmed()
    };
    println!("{} {}{}", "Файл настроек:".bold(), path.display(), origin);
    println!();
    println!("{}", serde_json::to_string_pretty(settings)?);
    Ok(())
}

pub fn init(path: &Path) -> Result<()> {
    if path.exists() && !confirm("Файл настроек существует. Перезаписать значениями по умолчанию?") {
        println!("Отменено.");
        return Ok(());
    }

    config::save_settings(path, &Settings::default())?;
    println!(
        "{} {}",
        "Настройки сохранены:".green(),
        path.display().to_string().cyan()
    );
    Ok(())
}
