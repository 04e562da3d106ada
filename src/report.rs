//! Textual rendering of dashboard pages
//!
//! A page is a sequence of titled sections, each of which holds one
//! chart-ready table in CSV form. A section whose table could not be produced
//! is shown as unavailable, and the rest of the page is rendered as usual.

use crate::{dashboard, error, table::Table};
use tokio::io::{AsyncWrite, AsyncWriteExt};

/// Page being written to some output
#[derive(Debug)]
pub struct Page<W> {
    /// Where the page goes
    output: W,

    /// Number of sections written so far
    sections: usize,

    /// Number of sections that were unavailable
    failures: usize,
}
//
impl<W: AsyncWrite + Unpin> Page<W> {
    /// Start a page
    pub fn new(output: W) -> Self {
        Self {
            output,
            sections: 0,
            failures: 0,
        }
    }

    /// Write the header of a new section
    pub async fn header(&mut self, title: &str) -> crate::Result<()> {
        if self.sections > 0 {
            self.output.write_all(b"\n").await?;
        }
        self.sections += 1;
        self.output.write_all(format!("# {title}\n").as_bytes()).await?;
        Ok(())
    }

    /// Write a section holding a table, or an unavailability notice
    pub async fn section(&mut self, title: &str, table: error::Result<Table>) -> crate::Result<()> {
        self.header(title).await?;
        match table {
            Ok(table) => table.write_csv(&mut self.output).await?,
            Err(e) => {
                if dashboard::is_missing_data(&e) {
                    log::warn!("Section {title:?} is unavailable: {e}");
                } else {
                    log::error!("Section {title:?} is unavailable: {e}");
                }
                self.failures += 1;
                self.output
                    .write_all(format!("unavailable: {e}\n").as_bytes())
                    .await?;
            }
        }
        Ok(())
    }

    /// Write free-form lines within the current section
    pub async fn line(&mut self, text: &str) -> crate::Result<()> {
        self.output.write_all(text.as_bytes()).await?;
        self.output.write_all(b"\n").await?;
        Ok(())
    }

    /// Number of sections that were unavailable
    pub fn failures(&self) -> usize {
        self.failures
    }

    /// Flush the page to its output
    pub async fn finish(mut self) -> crate::Result<W> {
        self.output.flush().await?;
        Ok(self.output)
    }
}
