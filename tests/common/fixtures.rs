//! Temporary workspaces with a configuration document and a work file

use profile_harvester::{RunConfig, Session};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tempfile::TempDir;

/// Header row of generated work files
pub const INPUT_HEADER: &str = "link,category,city";

/// A temp directory holding `config.json`, `input.csv` and `output.csv`
pub struct Workspace {
    pub dir: TempDir,
}

impl Workspace {
    /// Workspace with `handles` as work items and `sessions` as the session table
    pub fn new(handles: &[&str], sessions: Vec<Session>) -> Self {
        let dir = TempDir::new().unwrap();
        let workspace = Self { dir };

        let mut input = format!("{INPUT_HEADER}\n");
        for handle in handles {
            input.push_str(&format!("https://www.instagram.com/{handle}/,shop,Tehran\n"));
        }
        workspace.write_input(&input);

        let config = RunConfig {
            sessions,
            input_file: workspace.input_path(),
            output_file: workspace.output_path(),
            delay: Duration::ZERO,
            count: handles.len(),
            fetch_timeout: Duration::from_secs(1),
            ..RunConfig::default()
        };
        workspace.write_config(&config);
        workspace
    }

    pub fn config_path(&self) -> PathBuf {
        self.dir.path().join("config.json")
    }

    pub fn input_path(&self) -> PathBuf {
        self.dir.path().join("input.csv")
    }

    pub fn output_path(&self) -> PathBuf {
        self.dir.path().join("output.csv")
    }

    pub fn write_input(&self, content: &str) {
        std::fs::write(self.input_path(), content).unwrap();
    }

    pub fn read_input(&self) -> String {
        std::fs::read_to_string(self.input_path()).unwrap()
    }

    pub fn write_config(&self, config: &RunConfig) {
        std::fs::write(self.config_path(), serde_json::to_string_pretty(config).unwrap()).unwrap();
    }

    pub fn read_config(&self) -> RunConfig {
        RunConfig::from_json(&std::fs::read_to_string(self.config_path()).unwrap()).unwrap()
    }

    /// Change the stored configuration in place
    pub fn update_config(&self, change: impl FnOnce(&mut RunConfig)) {
        let mut config = self.read_config();
        change(&mut config);
        self.write_config(&config);
    }

    /// Data rows of the result file (header excluded); empty when absent
    pub fn output_rows(&self) -> Vec<Vec<String>> {
        read_rows(&self.output_path()).into_iter().skip(1).collect()
    }
}

/// Parse a CSV file; a missing file has no rows
pub fn read_rows(path: &Path) -> Vec<Vec<String>> {
    match std::fs::read_to_string(path) {
        Ok(text) => profile_harvester::csv::parse_rows(&text),
        Err(_) => Vec::new(),
    }
}

/// `count` active sessions tagged `s0`, `s1`, ...
pub fn sessions(count: usize) -> Vec<Session> {
    (0..count)
        .map(|i| Session::new(format!("tok{i}"), format!("s{i}")))
        .collect()
}
