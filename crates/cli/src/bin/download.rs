//! Download a Drive file, or every file of a folder.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use rusty_drive_cli::{connect, export_mime_type, init_logging, output_path};
use rusty_drive_storage::File;

#[derive(Parser)]
#[command(name = "drive-download")]
#[command(about = "Download a file or folder")]
struct Args {
    /// Target file or folder to download.
    #[arg(short, long)]
    input: String,

    /// Output folder to store downloaded files.
    #[arg(short, long)]
    output: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logging();
    let args: Args = Args::parse();

    let client = connect()?;
    let drive = client.operations();

    let target: File = drive
        .get_file(&args.input, true)
        .await?
        .with_context(|| format!("File not found: {}", args.input))?;

    let files: Vec<File> = if target.is_directory() == Some(true) {
        drive.list_children(&target).await?
    } else {
        vec![target]
    };

    for file in files {
        if file.is_directory() == Some(true) {
            log::warn!("Skipping folder {}", file);
            continue;
        }
        let dest: PathBuf = output_path(&args.output, &file)?;
        drive
            .download_file(&file.id, &dest, export_mime_type(&file))
            .await
            .with_context(|| format!("Failed to download {}", file))?;
        println!("Downloaded: {}", file);
    }
    Ok(())
}
