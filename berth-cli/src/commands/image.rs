//! Image command handlers

use anyhow::Result;
use berth_client::operations::ListImages;
use berth_core::ErrorKind;
use berth_core::domain::from_reply;
use berth_core::domain::image::ImageSummary;
use colored::*;

use super::{format_size, run_operation};
use crate::config::Config;

/// List images
pub async fn list_images(config: &Config, show_all: bool, show_digests: bool) -> Result<()> {
    let op = ListImages {
        show_all,
        show_digests,
    };

    let images: Vec<ImageSummary> = match run_operation(config, op).await {
        Ok(Some(document)) => from_reply(document)?,
        Ok(None) => Vec::new(),
        Err(e) if is_empty_json(&e) => Vec::new(),
        Err(e) => return Err(e),
    };

    if images.is_empty() {
        println!("{}", "No images found.".yellow());
    } else {
        println!("{}", format!("Found {} image(s):", images.len()).bold());
        println!();
        for image in &images {
            print_image_summary(image, show_digests);
        }
    }

    Ok(())
}

pub(crate) fn is_empty_json(error: &anyhow::Error) -> bool {
    error
        .downcast_ref::<berth_core::JobError>()
        .is_some_and(|e| e.kind() == ErrorKind::EmptyJson)
}

fn print_image_summary(image: &ImageSummary, show_digests: bool) {
    let tags: Vec<&str> = image.tags().collect();
    let title = if tags.is_empty() {
        "<none>".to_string()
    } else {
        tags.join(", ")
    };

    println!("  {} {}", "▸".cyan(), title.bold());
    println!("    ID:      {}", image.short_id().dimmed());
    println!("    Size:    {}", format_size(image.size));
    if let Some(created) = image.created_at() {
        println!(
            "    Created: {}",
            created.format("%Y-%m-%d %H:%M:%S").to_string().dimmed()
        );
    }
    if show_digests {
        for digest in image.repo_digests.iter().flatten() {
            println!("    Digest:  {}", digest.dimmed());
        }
    }
    println!();
}
