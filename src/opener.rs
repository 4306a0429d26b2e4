//! Handing a bookmark's URL to the desktop's browser.

use std::process::{Command, Stdio};

use crate::error::Result;

/// Something that can show a URL to the user.
pub trait UrlOpener {
    fn open(&self, url: &str) -> Result<()>;
}

impl<T: UrlOpener + ?Sized> UrlOpener for &T {
    fn open(&self, url: &str) -> Result<()> {
        (**self).open(url)
    }
}

/// Launches the platform's URL handler and does not wait for it.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemOpener;

impl UrlOpener for SystemOpener {
    fn open(&self, url: &str) -> Result<()> {
        let (program, args) = launcher(url);
        tracing::debug!(program, url, "opening url");

        Command::new(program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;
        Ok(())
    }
}

/// The program and arguments that open `url` on this platform.
pub fn launcher(url: &str) -> (&'static str, Vec<&str>) {
    if cfg!(target_os = "windows") {
        ("rundll32", vec!["url.dll,FileProtocolHandler", url])
    } else if cfg!(target_os = "macos") {
        ("open", vec![url])
    } else {
        ("xdg-open", vec![url])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn launcher_passes_url_last() {
        let (program, args) = launcher("https://a.example");

        assert!(!program.is_empty());
        assert_eq!(args.last(), Some(&"https://a.example"));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn linux_uses_xdg_open() {
        assert_eq!(launcher("https://a.example").0, "xdg-open");
    }
}
