//! Common test utilities for bk integration tests.
//!
//! Provides `TestEnv` for isolated test environments that don't pollute
//! the user's `~/.local/share/brokerage/` or `~/.config/brokerage/` directories.

#![allow(dead_code)]

use assert_cmd::Command;
use serde_json::Value;
pub use tempfile::TempDir;

/// A test environment with isolated data and config storage.
///
/// The `bk()` method returns a `Command` that sets `BK_DATA_DIR` and
/// `BK_CONFIG_DIR` per-invocation, making tests parallel-safe.
pub struct TestEnv {
    pub data_dir: TempDir,
    pub config_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            data_dir: TempDir::new().unwrap(),
            config_dir: TempDir::new().unwrap(),
        }
    }

    /// Create a new test environment and run `bk system init`.
    pub fn init() -> Self {
        let env = Self::new();
        env.bk().args(["system", "init"]).assert().success();
        env
    }

    /// Get a Command for the bk binary with isolated directories.
    pub fn bk(&self) -> Command {
        let mut cmd = Command::new(env!("CARGO_BIN_EXE_bk"));
        cmd.current_dir(self.data_dir.path());
        cmd.env("BK_DATA_DIR", self.data_dir.path());
        cmd.env("BK_CONFIG_DIR", self.config_dir.path());
        cmd.env_remove("BK_LOG");
        cmd
    }

    /// Run a command that must succeed and parse its JSON stdout.
    pub fn json(&self, args: &[&str]) -> Value {
        let output = self.bk().args(args).assert().success().get_output().clone();
        serde_json::from_slice(&output.stdout).unwrap()
    }

    pub fn data_path(&self) -> &std::path::Path {
        self.data_dir.path()
    }

    pub fn config_path(&self) -> &std::path::Path {
        self.config_dir.path()
    }

    /// Create a property and return its ID.
    pub fn create_property(&self, title: &str, price: &str, city: &str) -> String {
        let value = self.json(&[
            "property", "create", title, "--price", price, "--agent", "agent-1", "--city", city,
        ]);
        value["id"].as_str().unwrap().to_string()
    }

    /// Create a client and return its ID.
    pub fn create_client(&self, first: &str, last: &str) -> String {
        let email = format!("{}@example.com", first.to_lowercase());
        let value = self.json(&["client", "create", first, last, "--email", &email]);
        value["id"].as_str().unwrap().to_string()
    }

    /// Create a pending sale for agent-1 and return its ID.
    pub fn create_transaction(&self, property: &str, client: &str, price: &str) -> String {
        let value = self.json(&[
            "transaction",
            "create",
            "--property",
            property,
            "--client",
            client,
            "--agent",
            "agent-1",
            "--sale-price",
            price,
        ]);
        value["id"].as_str().unwrap().to_string()
    }
}

impl Default for TestEnv {
    fn default() -> Self {
        Self::new()
    }
}
