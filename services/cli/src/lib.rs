mod cli;
mod commands;
mod infra;
mod render;

use address_trust::error::AppError;

pub fn run() -> Result<(), AppError> {
    cli::run()
}
