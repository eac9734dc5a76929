use std::{
    fs::{self, File},
    io::{self, BufWriter, Write},
    path::{Path, PathBuf},
};

use serde_json::Value;

/// One JSON file per key under a directory.
pub struct Cache {
    path: PathBuf,
}

impl Cache {
    pub fn new(path: &Path) -> io::Result<Cache> {
        fs::create_dir_all(path)?;
        Ok(Cache {
            path: path.to_path_buf(),
        })
    }

    pub fn write(&self, key: &str, json: &Value) -> io::Result<()> {
        let file = File::create(self.key_path(key))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, json)?;
        writer.flush()
    }

    pub fn read(&self, key: &str) -> io::Result<Option<Value>> {
        let path = self.key_path(key);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(path)?;
        let json = serde_json::from_str(&contents)?;
        tracing::trace!(key, "cache read");
        Ok(Some(json))
    }

    fn key_path(&self, key: &str) -> PathBuf {
        let file_name: String = key
            .chars()
            .map(|c| match c {
                'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => c,
                _ => '_',
            })
            .collect();
        self.path.join(format!("{}.json", file_name))
    }
}
