//! Day directories and solution templates

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::config::TemplateConfig;
use crate::error::{Error, Result};

/// Name of the template picked when `--template` is omitted and several exist
pub const DEFAULT_TEMPLATE: &str = "default";

/// Zero-padded directory name for a puzzle day, e.g. `03`.
pub fn day_dir_name(day: u32) -> String {
    format!("{day:02}")
}

/// `<cwd>/<day:02>`
pub fn dir_for_day(day: u32) -> io::Result<PathBuf> {
    Ok(std::env::current_dir()?.join(day_dir_name(day)))
}

/// Replace `{name}` placeholders in `command`.
///
/// Only `{src}` is recognised. A `{` without a closing `}` is kept verbatim.
pub fn interpolate_command(command: &str, src: &str) -> Result<String> {
    let mut out = String::with_capacity(command.len() + src.len());
    let mut rest = command;
    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        let Some(close) = after.find('}') else {
            out.push_str(&rest[open..]);
            return Ok(out);
        };
        match &after[..close] {
            "src" => out.push_str(src),
            other => return Err(Error::UnknownVariable(other.to_string())),
        }
        rest = &after[close + 1..];
    }
    out.push_str(rest);
    Ok(out)
}

/// Pick a template by name, or fall back to `default` / the only one configured.
pub fn select_template<'a>(
    templates: &'a BTreeMap<String, TemplateConfig>,
    name: Option<&str>,
) -> Result<(&'a str, &'a TemplateConfig)> {
    if let Some(name) = name {
        return templates
            .get_key_value(name)
            .map(|(k, v)| (k.as_str(), v))
            .ok_or_else(|| Error::UnknownTemplate(name.to_string()));
    }
    if let Some((k, v)) = templates.get_key_value(DEFAULT_TEMPLATE) {
        return Ok((k.as_str(), v));
    }
    let mut iter = templates.iter();
    match (iter.next(), iter.next()) {
        (None, _) => Err(Error::NoTemplates),
        (Some((k, v)), None) => Ok((k.as_str(), v)),
        (Some(_), Some(_)) => Err(Error::AmbiguousTemplate(
            templates.keys().cloned().collect::<Vec<_>>().join(", "),
        )),
    }
}

/// Copy `template_dir` into `day_dir`, leaving files that already exist alone.
///
/// Returns the number of files created.
pub async fn scaffold(template_dir: &Path, day_dir: &Path) -> io::Result<usize> {
    let mut pending = vec![(template_dir.to_path_buf(), day_dir.to_path_buf())];
    let mut created = 0;
    while let Some((from, to)) = pending.pop() {
        let mut entries = tokio::fs::read_dir(&from).await?;
        tokio::fs::create_dir_all(&to).await?;
        while let Some(entry) = entries.next_entry().await? {
            let target = to.join(entry.file_name());
            if entry.file_type().await?.is_dir() {
                pending.push((entry.path(), target));
            } else if tokio::fs::try_exists(&target).await? {
                debug!(path = %target.display(), "keeping existing file");
            } else {
                tokio::fs::copy(entry.path(), &target).await?;
                created += 1;
            }
        }
    }
    Ok(created)
}

/// Entry file of `template` for `day`, relative to the working directory.
pub fn src_for_day(template: &TemplateConfig, day: u32) -> String {
    Path::new(&day_dir_name(day))
        .join(&template.src)
        .to_string_lossy()
        .into_owned()
}

/// Run `command` through the platform shell and wait for it.
pub async fn run_command(command: &str) -> Result<()> {
    info!(command, "running");
    let mut cmd = if cfg!(windows) {
        let mut c = tokio::process::Command::new("cmd");
        c.arg("/C");
        c
    } else {
        let mut c = tokio::process::Command::new("sh");
        c.arg("-c");
        c
    };
    let status = cmd
        .arg(command)
        .status()
        .await
        .map_err(|e| Error::CommandFailed(format!("{command}: {e}")))?;
    if !status.success() {
        return Err(Error::CommandFailed(format!("{command}: {status}")));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template(src: &str) -> TemplateConfig {
        TemplateConfig {
            dir: PathBuf::from("templates/x"),
            src: src.to_string(),
            run: None,
        }
    }

    #[test]
    fn interpolates_src() {
        assert_eq!(
            interpolate_command("echo {src}", "main.go").unwrap(),
            "echo main.go"
        );
    }

    #[test]
    fn interpolates_every_occurrence() {
        assert_eq!(
            interpolate_command("gcc {src} && ./a.out < {src}.in", "03/a.c").unwrap(),
            "gcc 03/a.c && ./a.out < 03/a.c.in"
        );
    }

    #[test]
    fn unknown_variable_is_named() {
        let err = interpolate_command("echo {unknown}", "main.go").unwrap_err();
        assert!(matches!(err, Error::UnknownVariable(ref name) if name == "unknown"));
        assert!(err.to_string().contains("unknown"));
    }

    #[test]
    fn unterminated_brace_is_verbatim() {
        assert_eq!(
            interpolate_command("awk '{print $1' {src", "x").unwrap(),
            "awk '{print $1' {src"
        );
    }

    #[test]
    fn command_without_placeholders_is_unchanged() {
        assert_eq!(interpolate_command("make", "x").unwrap(), "make");
    }

    #[test]
    fn day_dirs_are_zero_padded() {
        assert!(dir_for_day(3).unwrap().ends_with("03"));
        assert!(dir_for_day(25).unwrap().ends_with("25"));
        assert_eq!(day_dir_name(7), "07");
    }

    #[test]
    fn src_is_relative_to_working_directory() {
        assert_eq!(
            Path::new(&src_for_day(&template("src/main.rs"), 4)),
            Path::new("04").join("src").join("main.rs")
        );
    }

    #[test]
    fn select_by_name() {
        let mut templates = BTreeMap::new();
        templates.insert("go".to_string(), template("main.go"));
        templates.insert("rust".to_string(), template("main.rs"));

        let (name, t) = select_template(&templates, Some("rust")).unwrap();
        assert_eq!(name, "rust");
        assert_eq!(t.src, "main.rs");
        assert!(matches!(
            select_template(&templates, Some("zig")),
            Err(Error::UnknownTemplate(_))
        ));
    }

    #[test]
    fn select_without_name() {
        let mut templates = BTreeMap::new();
        assert!(matches!(
            select_template(&templates, None),
            Err(Error::NoTemplates)
        ));

        templates.insert("go".to_string(), template("main.go"));
        assert_eq!(select_template(&templates, None).unwrap().0, "go");

        templates.insert("rust".to_string(), template("main.rs"));
        assert!(matches!(
            select_template(&templates, None),
            Err(Error::AmbiguousTemplate(ref names)) if names == "go, rust"
        ));

        templates.insert(DEFAULT_TEMPLATE.to_string(), template("main.py"));
        assert_eq!(select_template(&templates, None).unwrap().0, "default");
    }

    #[tokio::test]
    async fn scaffold_copies_without_overwriting() {
        let dir = tempfile::tempdir().unwrap();
        let template_dir = dir.path().join("template");
        std::fs::create_dir_all(template_dir.join("src")).unwrap();
        std::fs::write(template_dir.join("Makefile"), "all:\n").unwrap();
        std::fs::write(template_dir.join("src/main.rs"), "fn main() {}\n").unwrap();

        let day_dir = dir.path().join("05");
        std::fs::create_dir_all(day_dir.join("src")).unwrap();
        std::fs::write(day_dir.join("src/main.rs"), "// my solution\n").unwrap();

        let created = scaffold(&template_dir, &day_dir).await.unwrap();

        assert_eq!(created, 1);
        assert_eq!(
            std::fs::read_to_string(day_dir.join("Makefile")).unwrap(),
            "all:\n"
        );
        assert_eq!(
            std::fs::read_to_string(day_dir.join("src/main.rs")).unwrap(),
            "// my solution\n"
        );
        assert_eq!(scaffold(&template_dir, &day_dir).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn scaffold_missing_template_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = scaffold(&dir.path().join("nope"), &dir.path().join("01")).await;
        assert!(result.is_err());
        assert!(!dir.path().join("01").exists());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn run_command_reports_exit_status() {
        assert!(run_command("true").await.is_ok());
        let err = run_command("exit 3").await.unwrap_err();
        assert!(matches!(err, Error::CommandFailed(_)));
    }
}
