//! Command handlers.

use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use pcs_client::{AccessToken, ByteRange, Client};
use pcs_protocol::options::{
    AddTaskOptions, CancelTaskOptions, DiffOptions, EntryRange, ListFilesOptions,
    ListRecycleOptions, ListTaskOptions, QueryTaskOptions, SearchOptions, TaskQuery,
    ThumbnailOptions,
};
use pcs_protocol::{FileOptions, FileRecord, OnDup};
use pcs_transfer::fingerprint_file;
use pcs_upload::{Strategy, UploadEvent, UploadOrchestrator};
use serde::Serialize;
use tokio::sync::mpsc;
use tracing::warn;

use crate::config::CliConfig;
use crate::{Commands, RecycleAction, TaskAction};

pub async fn run(command: Commands, config: &CliConfig) -> anyhow::Result<()> {
    // Local-only commands need no token.
    match command {
        Commands::Fingerprint { local } => return fingerprint(local).await,
        Commands::Config => return print_json(&redacted(config)),
        _ => {}
    }

    let client = Client::new(config.token()?, &config.client)?;
    match command {
        Commands::Quota => {
            let quota = client.quota().await?;
            println!(
                "used {} of {} bytes ({} available)",
                quota.used,
                quota.quota,
                quota.available()
            );
        }
        Commands::Upload {
            local,
            remote,
            strategy,
            newcopy,
        } => {
            let opts = FileOptions::new(remote).with_ondup(OnDup::from_overwrite(!newcopy));
            upload(&client, config, &local, &opts, strategy).await?;
        }
        Commands::Download {
            remote,
            local,
            range,
        } => match range {
            Some(range) => {
                let range = parse_byte_range(&range)?;
                let data = client.partial_download(&remote, range).await?;
                tokio::fs::write(&local, &data)
                    .await
                    .with_context(|| format!("failed to write {}", local.display()))?;
                eprintln!("wrote {} bytes to {}", data.len(), local.display());
            }
            None => {
                let written = client.download_to(&remote, &local).await?;
                eprintln!("wrote {written} bytes to {}", local.display());
            }
        },
        Commands::Meta { paths } => {
            if let [path] = paths.as_slice() {
                print_json(&client.meta(path).await?)?;
            } else {
                let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
                print_json(&client.batch_meta(&refs).await?)?;
            }
        }
        Commands::Ls { path, limit } => {
            let opts = ListFilesOptions {
                limit: limit.as_deref().map(parse_entry_range).transpose()?,
                ..ListFilesOptions::new(path)
            };
            print_records(&client.list(&opts).await?);
        }
        Commands::Mkdir { path } => print_json(&client.mkdir(&path).await?)?,
        Commands::Mv { from, to } => print_json(&client.move_file(&from, &to).await?)?,
        Commands::Cp { from, to } => print_json(&client.copy_file(&from, &to).await?)?,
        Commands::Rm { paths } => {
            if let [path] = paths.as_slice() {
                client.delete(path).await?;
            } else {
                let refs: Vec<&str> = paths.iter().map(String::as_str).collect();
                client.batch_delete(&refs).await?;
            }
            eprintln!("deleted {} item(s)", paths.len());
        }
        Commands::Search {
            dir,
            word,
            recursive,
        } => {
            let opts = SearchOptions {
                path: dir,
                word,
                recursive,
            };
            print_records(&client.search(&opts).await?);
        }
        Commands::Diff { cursor } => {
            let opts = cursor.map_or_else(DiffOptions::first, |cursor| DiffOptions { cursor });
            print_json(&client.diff(&opts).await?)?;
        }
        Commands::Thumbnail {
            remote,
            local,
            width,
            height,
            quality,
        } => {
            let opts = ThumbnailOptions {
                path: remote,
                quality,
                width,
                height,
            };
            let data = client.thumbnail(&opts).await?;
            tokio::fs::write(&local, &data)
                .await
                .with_context(|| format!("failed to write {}", local.display()))?;
        }
        Commands::Recycle { action } => recycle(&client, action).await?,
        Commands::Task { action } => task(&client, action).await?,
        Commands::Fingerprint { .. } | Commands::Config => unreachable!("handled above"),
    }
    Ok(())
}

async fn upload(
    client: &Client,
    config: &CliConfig,
    local: &Path,
    opts: &FileOptions,
    strategy: Strategy,
) -> anyhow::Result<()> {
    let mut orch = UploadOrchestrator::new(config.upload.clone())?;
    let events = orch.take_events();

    let cancel = orch.cancel_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, stopping upload");
            cancel.cancel();
        }
    });
    let progress = events.map(|rx| tokio::spawn(report_progress(rx)));

    let outcome = orch.upload(client, local, opts, strategy).await;
    // Closes the event channel.
    drop(orch);
    if let Some(progress) = progress {
        let _ = progress.await;
    }

    let outcome = outcome?;
    eprintln!("uploaded via {} ({})", outcome.strategy, outcome.upload_id);
    print_json(&outcome.record)
}

async fn report_progress(mut rx: mpsc::Receiver<UploadEvent>) {
    while let Some(event) = rx.recv().await {
        match event {
            UploadEvent::BlockUploaded {
                uploaded_blocks,
                total_blocks,
                uploaded_bytes,
                total_bytes,
                ..
            } => {
                let pct = if total_bytes == 0 {
                    100.0
                } else {
                    uploaded_bytes as f64 / total_bytes as f64 * 100.0
                };
                eprintln!("block {uploaded_blocks}/{total_blocks} ({pct:.1}%)");
            }
            UploadEvent::RapidMiss { .. } => eprintln!("content not on server, sending bytes"),
            UploadEvent::Merging { blocks, .. } => eprintln!("merging {blocks} blocks"),
            _ => {}
        }
    }
}

async fn recycle(client: &Client, action: RecycleAction) -> anyhow::Result<()> {
    match action {
        RecycleAction::List { start, limit } => {
            print_records(&client.list_recycle(&ListRecycleOptions { start, limit }).await?);
        }
        RecycleAction::Restore { fs_ids } => {
            let resp = if let [fs_id] = fs_ids.as_slice() {
                client.restore(*fs_id).await?
            } else {
                client.batch_restore(&fs_ids).await?
            };
            print_json(&resp)?;
        }
        RecycleAction::Empty => {
            client.empty_recycle().await?;
            eprintln!("recycle bin emptied");
        }
    }
    Ok(())
}

async fn task(client: &Client, action: TaskAction) -> anyhow::Result<()> {
    match action {
        TaskAction::Add {
            source_url,
            save_path,
        } => {
            let opts = AddTaskOptions {
                source_url,
                save_path,
                ..Default::default()
            };
            println!("{}", client.add_offline_task(&opts).await?);
        }
        TaskAction::Query { task_ids } => {
            let opts = QueryTaskOptions {
                task_ids,
                op_type: TaskQuery::Progress,
                expires: None,
            };
            print_json(&client.query_offline_tasks(&opts).await?)?;
        }
        TaskAction::List => {
            print_json(&client.list_offline_tasks(&ListTaskOptions::default()).await?)?;
        }
        TaskAction::Cancel { task_id } => {
            let opts = CancelTaskOptions {
                task_id,
                expires: None,
            };
            client.cancel_offline_task(&opts).await?;
            eprintln!("task {task_id} cancelled");
        }
    }
    Ok(())
}

async fn fingerprint(local: PathBuf) -> anyhow::Result<()> {
    let fp = tokio::task::spawn_blocking(move || fingerprint_file(&local)).await??;
    println!("length:        {}", fp.length);
    println!("content-md5:   {}", fp.whole_md5);
    println!("slice-md5:     {}", fp.slice_md5);
    println!("content-crc32: {}", fp.crc32);
    Ok(())
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn print_records(records: &[FileRecord]) {
    for r in records {
        let kind = if r.is_dir { 'd' } else { '-' };
        println!("{kind} {:>14} {}", r.size, r.path);
    }
}

fn redacted(config: &CliConfig) -> CliConfig {
    CliConfig {
        access_token: config
            .access_token
            .as_ref()
            .map(|_| AccessToken::new("<redacted>")),
        ..config.clone()
    }
}

/// Parses `start-end` (inclusive) or `start-`.
fn parse_byte_range(s: &str) -> anyhow::Result<ByteRange> {
    let Some((start, end)) = s.split_once('-') else {
        bail!("byte range {s:?} must look like start-end or start-");
    };
    let start: u64 = start
        .trim()
        .parse()
        .with_context(|| format!("invalid range start in {s:?}"))?;
    let range = match end.trim() {
        "" => ByteRange::from_offset(start),
        end => ByteRange::new(
            start,
            end.parse()
                .with_context(|| format!("invalid range end in {s:?}"))?,
        ),
    };
    range.validate()?;
    Ok(range)
}

/// Parses a listing window `start-end`.
fn parse_entry_range(s: &str) -> anyhow::Result<EntryRange> {
    let Some((start, end)) = s.split_once('-') else {
        bail!("limit {s:?} must look like start-end");
    };
    Ok(EntryRange {
        start: start
            .trim()
            .parse()
            .with_context(|| format!("invalid limit start in {s:?}"))?,
        end: end
            .trim()
            .parse()
            .with_context(|| format!("invalid limit end in {s:?}"))?,
    })
}
