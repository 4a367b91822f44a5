use minijinja::{Environment, context};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const AMP_TEMPLATE: &str = "leave_action.amp.html";
pub const HTML_TEMPLATE: &str = "leave_action_fallback.html";

/// Email templates loaded from a directory on disk.
pub struct EmailTemplates {
    env: Environment<'static>,
    dir: PathBuf,
}

impl std::fmt::Debug for EmailTemplates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmailTemplates")
            .field("dir", &self.dir)
            .finish()
    }
}

impl EmailTemplates {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        let dir = dir.into();
        let mut env = Environment::new();
        env.set_loader(minijinja::path_loader(dir.clone()));
        Self { env, dir }
    }

    /// First existing directory among the explicit one and the usual locations.
    /// `None` means callers use the inline bodies.
    pub fn discover(explicit: Option<&Path>) -> Option<Self> {
        let mut candidates: Vec<PathBuf> = Vec::new();
        if let Some(dir) = explicit {
            candidates.push(dir.to_path_buf());
        }
        candidates.push(PathBuf::from("templates"));
        candidates.push(PathBuf::from("server/templates"));
        candidates.push(Path::new(env!("CARGO_MANIFEST_DIR")).join("templates"));

        match candidates.into_iter().find(|d| d.is_dir()) {
            Some(dir) => {
                tracing::info!(dir = %dir.display(), "email templates loaded");
                Some(Self::from_dir(dir))
            }
            None => {
                tracing::warn!("email templates directory not found, using inline templates");
                None
            }
        }
    }

    /// Render `name` with the value bound as `leave`.
    pub fn render_leave<T: Serialize>(&self, name: &str, leave: &T) -> Result<String, minijinja::Error> {
        self.env.get_template(name)?.render(context! { leave => leave })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Ctx {
        employee_name: String,
    }

    #[test]
    fn renders_from_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("hello.html"), "Hi {{ leave.employee_name }}").unwrap();

        let templates = EmailTemplates::from_dir(dir.path());
        let out = templates
            .render_leave(
                "hello.html",
                &Ctx {
                    employee_name: "Dana".into(),
                },
            )
            .unwrap();
        assert_eq!(out, "Hi Dana");
    }

    #[test]
    fn missing_template_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let templates = EmailTemplates::from_dir(dir.path());
        assert!(templates.render_leave("nope.html", &()).is_err());
    }

    #[test]
    fn explicit_directory_wins() {
        let dir = tempfile::tempdir().unwrap();
        let found = EmailTemplates::discover(Some(dir.path())).unwrap();
        assert!(format!("{found:?}").contains(&*dir.path().to_string_lossy()));
    }
}
