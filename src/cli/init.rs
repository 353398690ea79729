use std::path::PathBuf;

use crate::db::{get_connection, init_db};
use crate::error::Result;
use crate::settings::{save_settings, Settings};

pub fn run(data_dir: Option<String>) -> Result<()> {
    let settings = match data_dir {
        Some(dir) => Settings { data_dir: dir },
        None => Settings::default(),
    };

    let path = PathBuf::from(&settings.data_dir);
    std::fs::create_dir_all(&path)?;
    let conn = get_connection(&path.join("fxdeals.db"))?;
    init_db(&conn)?;
    save_settings(&settings)?;

    println!("Initialized deal warehouse in {}", settings.data_dir);
    Ok(())
}
