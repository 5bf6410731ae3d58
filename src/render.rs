//! HTML page to PDF renderers

use crate::browser::ChromeRenderer;
use crate::error::FetchError;
use crate::process::{ProcessOutput, ProcessRunner, SystemRunner};
use clap::ValueEnum;
use std::path::Path;
use std::time::Duration;

/// Which renderer the archive command uses for HTML pages
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum RendererKind {
    /// wkhtmltopdf, run as an external process
    Wkhtmltopdf,
    /// Headless Chrome over the DevTools protocol
    Chrome,
    /// Never render; HTML pages are downloaded as-is
    None,
}

/// Renders the page at a URL into a PDF file
#[allow(async_fn_in_trait)]
pub trait PageRenderer {
    async fn render_pdf(
        &self,
        url: &str,
        output: &Path,
        timeout: Duration,
    ) -> Result<(), FetchError>;
}

/// Renders through the `wkhtmltopdf` command line tool
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer<R = SystemRunner> {
    runner: R,
    program: String,
}

impl<R: ProcessRunner> WkhtmltopdfRenderer<R> {
    pub fn new(runner: R, program: impl Into<String>) -> Self {
        Self {
            runner,
            program: program.into(),
        }
    }

    fn args(url: &str, output: &Path) -> Vec<String> {
        vec![
            "--quiet".to_string(),
            url.to_string(),
            output.display().to_string(),
        ]
    }
}

impl<R: ProcessRunner> PageRenderer for WkhtmltopdfRenderer<R> {
    async fn render_pdf(
        &self,
        url: &str,
        output: &Path,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        let result = self
            .runner
            .run(&self.program, &Self::args(url, output), timeout)
            .await?;
        let result = ProcessOutput {
            produced: Some(output.to_path_buf()),
            ..result
        };
        check_rendered(&self.program, &result)
    }
}

/// A render counts only with a zero exit and a non-empty file
fn check_rendered(program: &str, result: &ProcessOutput) -> Result<(), FetchError> {
    if !result.success() {
        return Err(FetchError::Process {
            program: program.to_string(),
            status: result.status,
            stderr: result.diagnostics().to_string(),
        });
    }
    let produced_bytes = result
        .produced
        .as_deref()
        .and_then(|p| std::fs::metadata(p).ok())
        .map(|m| m.len())
        .unwrap_or(0);
    if produced_bytes == 0 {
        return Err(FetchError::Render(format!("{} produced no output", program)));
    }
    Ok(())
}

/// Renderer used with `--renderer none`
#[derive(Debug, Clone, Copy, Default)]
pub struct NoRenderer;

impl PageRenderer for NoRenderer {
    async fn render_pdf(
        &self,
        _url: &str,
        _output: &Path,
        _timeout: Duration,
    ) -> Result<(), FetchError> {
        Err(FetchError::RenderDisabled)
    }
}

impl PageRenderer for ChromeRenderer {
    async fn render_pdf(
        &self,
        url: &str,
        output: &Path,
        timeout: Duration,
    ) -> Result<(), FetchError> {
        self.print_to_pdf(url, output, timeout).await
    }
}
