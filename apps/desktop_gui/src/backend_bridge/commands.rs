//! Backend commands queued from UI to backend worker.

use std::path::PathBuf;

use client_core::StatementRequest;

#[derive(Debug)]
pub enum BackendCommand {
    LoadStatement { path: PathBuf },
    ProcessStatement { request: StatementRequest },
}

impl BackendCommand {
    pub fn name(&self) -> &'static str {
        match self {
            BackendCommand::LoadStatement { .. } => "load_statement",
            BackendCommand::ProcessStatement { .. } => "process_statement",
        }
    }
}
