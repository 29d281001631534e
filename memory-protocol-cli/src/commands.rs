//! Subcommand implementations

use crate::host::Stream;
use crate::report::{CopyReport, ProbeReport};
use crate::store::BufferStore;
use anyhow::{Context, Result};
use memory_protocol::{OpenFlags, UrlProtocol};
use rayon::prelude::*;
use std::fs;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

/// Push each input through the protocol and read it back, one handle pair per file
pub fn copy_files<P>(protocol: &P, inputs: &[PathBuf], output_dir: Option<&Path>) -> Result<Vec<CopyReport>>
where
    P: UrlProtocol + ?Sized,
{
    if let Some(dir) = output_dir {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory: {:?}", dir))?;
    }

    inputs
        .par_iter()
        .map(|input| copy_one(protocol, input, output_dir))
        .collect()
}

fn copy_one<P>(protocol: &P, input: &Path, output_dir: Option<&Path>) -> Result<CopyReport>
where
    P: UrlProtocol + ?Sized,
{
    let data = fs::read(input).with_context(|| format!("Failed to read input: {:?}", input))?;
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Input has no file name: {:?}", input))?;
    let identifier = format!("{}:{}", protocol.name(), name);

    let mut writer = Stream::open(protocol, &identifier, OpenFlags::WRITE)
        .with_context(|| format!("Failed to open {} for writing", identifier))?;
    writer
        .write_all(&data)
        .with_context(|| format!("Failed to write {}", identifier))?;
    writer.close()?;

    let mut reader = Stream::open(protocol, &identifier, OpenFlags::READ)
        .with_context(|| format!("Failed to open {} for reading", identifier))?;
    let reported_size = reader
        .size()
        .with_context(|| format!("Failed to query size of {}", identifier))?;
    let mut read_back = Vec::with_capacity(data.len());
    reader
        .read_to_end(&mut read_back)
        .with_context(|| format!("Failed to read {}", identifier))?;
    log::debug!("Read back {} bytes from {}", read_back.len(), reader.identifier());
    reader.close()?;

    let verified = read_back == data;
    if !verified {
        log::warn!("Round trip mismatch for {}", identifier);
    }

    let output = match output_dir {
        Some(dir) => {
            let path = dir.join(&name);
            fs::write(&path, &read_back)
                .with_context(|| format!("Failed to write output: {:?}", path))?;
            Some(path.display().to_string())
        }
        None => None,
    };

    Ok(CopyReport {
        input: input.display().to_string(),
        identifier,
        bytes_written: data.len() as u64,
        reported_size,
        bytes_read: read_back.len() as u64,
        verified,
        output,
    })
}

/// Load a file into the store under its file name
pub fn preload(store: &BufferStore, path: &Path) -> Result<()> {
    let data = fs::read(path).with_context(|| format!("Failed to read preload file: {:?}", path))?;
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .with_context(|| format!("Preload file has no file name: {:?}", path))?;
    log::info!("Preloaded '{}' ({} bytes)", name, data.len());
    store.insert(name, data);
    Ok(())
}

/// Open each identifier read-only and report its size
pub fn probe<P>(protocol: &P, identifiers: &[String]) -> Vec<ProbeReport>
where
    P: UrlProtocol + ?Sized,
{
    identifiers
        .par_iter()
        .map(|identifier| {
            let result = Stream::open(protocol, identifier, OpenFlags::READ).and_then(|mut stream| {
                let size = stream.size();
                stream.close()?;
                size
            });
            match result {
                Ok(size) => ProbeReport {
                    identifier: identifier.clone(),
                    size: Some(size),
                    error: None,
                },
                Err(e) => ProbeReport {
                    identifier: identifier.clone(),
                    size: None,
                    error: Some(e.to_string()),
                },
            }
        })
        .collect()
}
