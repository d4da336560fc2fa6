//! Upload files into a Drive folder.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rusty_drive_cli::{connect, init_logging, progress_printer};
use rusty_drive_storage::File;

#[derive(Parser)]
#[command(name = "drive-upload")]
#[command(about = "Upload files into a Drive folder")]
struct Args {
    /// Target folder identifier.
    #[arg(short, long)]
    output: String,

    /// Files to upload.
    #[arg(short, long, num_args = 1.., required = true)]
    file: Vec<PathBuf>,

    /// Update existing files instead of uploading new ones.
    #[arg(short = 'U', long)]
    update_existing: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args: Args = Args::parse();

    let client = connect()?;
    let drive = client.operations();
    let progress = progress_printer();

    for path in &args.file {
        let file: File = drive
            .upload_file(&args.output, path, None, args.update_existing, Some(&progress))
            .await
            .with_context(|| format!("Failed to upload {}", path.display()))?;
        println!();
        println!("File uploaded: {}", file);
    }
    Ok(())
}
