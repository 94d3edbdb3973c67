//! Integration tests for Fancy

mod cli_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use tempfile::TempDir;

    fn fancy() -> Command {
        let mut cmd = cargo_bin_cmd!("fancy");
        cmd.env_remove("CLI_TARGET_PATH")
            .env_remove("CLI_HOME_PATH")
            .env_remove("FANCY_CONFIG");
        cmd
    }

    #[test]
    fn help_displays() {
        fancy()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("cached packages"));
    }

    #[test]
    fn version_displays() {
        fancy()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("fancy"));
    }

    #[test]
    fn config_path() {
        fancy()
            .args(["config", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("config.toml"));
    }

    #[test]
    fn config_show() {
        let dir = TempDir::new().unwrap();
        fancy()
            .arg("--config")
            .arg(dir.path().join("missing.toml"))
            .args(["config", "show"])
            .assert()
            .success()
            .stdout(predicate::str::contains("[runtime]").and(predicate::str::contains("@fancy-cli/init")));
    }

    #[test]
    fn config_init_writes_defaults_once() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("fancy").join("config.toml");

        fancy()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Configuration initialized"));
        assert!(std::fs::read_to_string(&path).unwrap().contains("[registry]"));

        fancy()
            .arg("--config")
            .arg(&path)
            .args(["config", "init"])
            .assert()
            .success()
            .stderr(predicate::str::contains("already exists"));
    }

    #[test]
    fn config_invalid_fails() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[runtime\ninterpreter = ").unwrap();
        fancy()
            .arg("--config")
            .arg(&path)
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"));
    }

    #[test]
    fn debug_reports_config_load_cause() {
        let dir = TempDir::new().unwrap();
        fancy()
            .arg("--debug")
            .arg("--config")
            .arg(dir.path())
            .args(["config", "show"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Error:"))
            .stdout(predicate::str::contains("caused by"));
    }

    #[test]
    fn debug_from_config_file_enables_debug_logs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[general]\ndebug = true\n").unwrap();
        fancy()
            .arg("--config")
            .arg(&path)
            .arg("--home")
            .arg(dir.path())
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("Cache home:"));
    }

    #[test]
    fn cache_path_uses_home() {
        let home = TempDir::new().unwrap();
        fancy()
            .arg("--home")
            .arg(home.path())
            .args(["cache", "path"])
            .assert()
            .success()
            .stdout(predicate::str::contains("dependencies").and(predicate::str::contains("node_modules")));
    }

    #[test]
    fn cache_list_empty() {
        let home = TempDir::new().unwrap();
        fancy()
            .env("CLI_HOME_PATH", home.path())
            .args(["cache", "list"])
            .assert()
            .success()
            .stdout(predicate::str::contains("No cached packages found."));
    }

    #[test]
    fn cache_list_shows_entries() {
        let home = TempDir::new().unwrap();
        let entry = home
            .path()
            .join("dependencies/node_modules/_@fancy-cli_init@1.2.3@@fancy-cli/init");
        std::fs::create_dir_all(&entry).unwrap();

        fancy()
            .arg("--home")
            .arg(home.path())
            .args(["cache", "list", "--format", "plain"])
            .assert()
            .success()
            .stdout("@fancy-cli/init@1.2.3\n");
    }
}

#[cfg(unix)]
mod dispatch_tests {
    use assert_cmd::{cargo::cargo_bin_cmd, Command};
    use predicates::prelude::*;
    use std::os::unix::fs::PermissionsExt;
    use std::path::{Path, PathBuf};
    use tempfile::TempDir;

    /// Stands in for the interpreter: answers `--version`, otherwise records
    /// the script it was given and exits with `$FAKE_EXIT`
    const FAKE_INTERPRETER: &str = r#"#!/bin/sh
if [ "$1" = "--version" ]; then
  echo "${FAKE_VERSION:-v18.0.0}"
  exit 0
fi
printf '%s' "$2" > "$FAKE_OUT"
exit "${FAKE_EXIT:-0}"
"#;

    struct Fixture {
        dir: TempDir,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();

            let interpreter = dir.path().join("fake-node");
            std::fs::write(&interpreter, FAKE_INTERPRETER).unwrap();
            std::fs::set_permissions(&interpreter, std::fs::Permissions::from_mode(0o755)).unwrap();

            let config = format!(
                "[runtime]\ninterpreter = \"{}\"\nmin_version = \"12.0.0\"\n\n[commands]\ncomponent = \"@fancy-cli/component\"\n",
                interpreter.display()
            );
            std::fs::write(dir.path().join("config.toml"), config).unwrap();

            let module = dir.path().join("module");
            std::fs::create_dir_all(&module).unwrap();
            std::fs::write(module.join("package.json"), r#"{"main": "lib/index.js"}"#).unwrap();

            std::fs::create_dir_all(dir.path().join("empty")).unwrap();

            Self { dir }
        }

        fn path(&self, name: &str) -> PathBuf {
            self.dir.path().join(name)
        }

        fn recorded(&self) -> String {
            std::fs::read_to_string(self.path("out.txt")).unwrap_or_default()
        }

        fn command(&self, target: &Path) -> Command {
            let mut cmd = cargo_bin_cmd!("fancy");
            cmd.env_remove("CLI_TARGET_PATH")
                .env("FAKE_OUT", self.path("out.txt"))
                .arg("--config")
                .arg(self.path("config.toml"))
                .arg("--home")
                .arg(self.path("home"))
                .arg("--target-path")
                .arg(target);
            cmd
        }
    }

    #[test]
    fn exit_codes_pass_through() {
        let fixture = Fixture::new();
        for code in [0, 1, 127] {
            fixture
                .command(&fixture.path("module"))
                .env("FAKE_EXIT", code.to_string())
                .args(["init", "my-app"])
                .assert()
                .code(code);
        }
    }

    #[test]
    fn init_passes_arguments_to_the_package() {
        let fixture = Fixture::new();
        fixture
            .command(&fixture.path("module"))
            .args(["init", "my-app", "--force"])
            .assert()
            .success();

        let script = fixture.recorded();
        assert!(script.contains("require("), "{script}");
        assert!(script.contains("module/lib/index.js"), "{script}");
        assert!(script.contains(r#"["my-app",{"force":true}]"#), "{script}");
    }

    #[test]
    fn external_command_options() {
        let fixture = Fixture::new();
        fixture
            .command(&fixture.path("module"))
            .args(["component", "Button", "--style=css", "--dry-run"])
            .assert()
            .success();

        let script = fixture.recorded();
        assert!(
            script.contains(r#"["Button",{"dryRun":true,"style":"css"}]"#),
            "{script}"
        );
    }

    #[test]
    fn module_without_manifest_is_a_no_op() {
        let fixture = Fixture::new();
        fixture
            .command(&fixture.path("empty"))
            .env("FAKE_EXIT", "9")
            .args(["init", "my-app"])
            .assert()
            .success();

        assert!(fixture.recorded().is_empty());
    }

    #[test]
    fn unknown_command_fails() {
        let fixture = Fixture::new();
        fixture
            .command(&fixture.path("module"))
            .args(["deploy", "prod"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("Unknown command: deploy"))
            .stderr(predicate::str::contains("Hint:"));

        assert!(fixture.recorded().is_empty());
    }

    #[test]
    fn old_runtime_fails_before_work() {
        let fixture = Fixture::new();
        fixture
            .command(&fixture.path("module"))
            .env("FAKE_VERSION", "v10.24.1")
            .args(["init", "my-app"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("too old"));

        assert!(fixture.recorded().is_empty());
    }
}
