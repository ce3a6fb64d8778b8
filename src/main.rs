use clap::{Parser, Subcommand};
use revstore::format::{self, Header, IndexEntry, IndexHeader};
use revstore::store::{LocalStore, ObjectKind, ObjectStore};
use revstore::{reverse_diff, NamedLock};
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "revstorectl",
    version = "1.0.0",
    about = "Inspect and exercise the backup store's object format, reverse-diff engine, store layout, and named lock"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Pack a file into a self-contained stored object, split into
    /// fixed-size inline blocks.
    Pack {
        input: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Maximum block size in bytes.
        #[arg(short, long, default_value = "65536")]
        block_size: usize,
    },
    /// Print a stored object's header and block index.
    Inspect { input: PathBuf },
    /// Reverse-diff a base object against a diff object, producing a new
    /// base-relative object.
    Diff {
        /// The delta object uploaded against the base.
        diff: PathBuf,
        /// The base object (opened twice internally, per the algorithm's
        /// two-handle requirement).
        from: PathBuf,
        #[arg(short, long)]
        output: PathBuf,
        /// Object ID to record as the base's ID if any block is shared.
        #[arg(long)]
        base_object_id: u64,
    },
    /// Print the on-disk path a local store would use for an object ID.
    StorePath {
        base_dir: PathBuf,
        id: u64,
        #[arg(long, value_enum, default_value = "file")]
        kind: KindArg,
    },
    /// Try to acquire a named lock, hold it briefly, then release it.
    Lock { path: PathBuf },
}

#[derive(Clone, clap::ValueEnum)]
enum KindArg {
    File,
    Dir,
}

impl From<KindArg> for ObjectKind {
    fn from(k: KindArg) -> Self {
        match k {
            KindArg::File => ObjectKind::File,
            KindArg::Dir => ObjectKind::Directory,
        }
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    match Cli::parse().command {
        Commands::Pack {
            input,
            output,
            block_size,
        } => pack(&input, &output, block_size)?,
        Commands::Inspect { input } => inspect(&input)?,
        Commands::Diff {
            diff,
            from,
            output,
            base_object_id,
        } => diff_cmd(&diff, &from, &output, base_object_id)?,
        Commands::StorePath {
            base_dir,
            id,
            kind,
        } => {
            let store = LocalStore::new(base_dir);
            println!("{}", store.path_for(id, kind.into()).display());
        }
        Commands::Lock { path } => lock_cmd(&path)?,
    }

    Ok(())
}

fn pack(input: &PathBuf, output: &PathBuf, block_size: usize) -> Result<(), Box<dyn std::error::Error>> {
    let data = std::fs::read(input)?;
    let blocks: Vec<&[u8]> = data.chunks(block_size.max(1)).collect();

    let prologue_size = format::HEADER_SIZE + 4 + 4;
    let data_size: u64 = blocks.iter().map(|b| b.len() as u64).sum();
    let index_size = format::INDEX_HEADER_SIZE + blocks.len() as u64 * format::INDEX_ENTRY_SIZE;

    let header = Header {
        num_blocks: blocks.len() as u64,
        container_size: prologue_size + data_size + index_size,
        modification_time: std::fs::metadata(input)?
            .modified()
            .ok()
            .and_then(|t| t.duration_since(std::time::UNIX_EPOCH).ok())
            .map(|d| d.as_secs())
            .unwrap_or(0),
        max_block_clear_size: block_size as u32,
        options: 0,
    };

    let mut out = File::create(output)?;
    format::write_header(&mut out, &header)?;
    format::write_filename(
        &mut out,
        input.file_name().map(|n| n.to_string_lossy()).unwrap_or_default().as_bytes(),
    )?;
    format::write_attributes(&mut out, b"")?;
    for b in &blocks {
        out.write_all(b)?;
    }
    format::write_index_header(
        &mut out,
        &IndexHeader {
            num_blocks: blocks.len() as u64,
            other_file_id: 0,
        },
    )?;
    for b in &blocks {
        let checksum = crc32fast::hash(b);
        format::write_index_entry(
            &mut out,
            &IndexEntry {
                encoded_size: b.len() as i64,
                clear_size: b.len() as i64,
                weighted_checksum: checksum,
                encoded_checksum: checksum,
            },
        )?;
    }

    println!(
        "packed {} into {} ({} block(s), {} B)",
        input.display(),
        output.display(),
        blocks.len(),
        header.container_size
    );
    Ok(())
}

fn inspect(input: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut f = File::open(input)?;
    let header = format::read_header(&mut f)?;
    let filename = format::read_filename(&mut f)?;
    let attributes = format::read_attributes(&mut f)?;

    println!("── stored object ───────────────────────────────────");
    println!("  path                 {}", input.display());
    println!("  num_blocks           {}", header.num_blocks);
    println!("  container_size       {} B", header.container_size);
    println!("  modification_time    {}", header.modification_time);
    println!("  max_block_clear_size {} B", header.max_block_clear_size);
    println!("  compressed           {}", header.is_compressed());
    println!("  filename             {:?}", String::from_utf8_lossy(&filename));
    println!("  attributes           {} B", attributes.len());

    format::seek_to_index(&mut f)?;
    let index_header = format::read_index_header(&mut f)?;
    println!(
        "  self_contained       {}",
        index_header.is_self_contained()
    );
    if !index_header.is_self_contained() {
        println!("  other_file_id        {:#x}", index_header.other_file_id);
    }
    for b in 0..index_header.num_blocks {
        let entry = format::read_index_entry(&mut f)?;
        if entry.is_inline() {
            println!(
                "  [{b:4}] inline  {:>8} B  checksum={}",
                entry.encoded_size,
                hex::encode(entry.encoded_checksum.to_be_bytes())
            );
        } else {
            println!(
                "  [{b:4}] ref -> block {}",
                entry.reference_index().unwrap()
            );
        }
    }
    Ok(())
}

fn diff_cmd(
    diff: &PathBuf,
    from: &PathBuf,
    output: &PathBuf,
    base_object_id: u64,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut diff_f = File::open(diff)?;
    let mut from_f = File::open(from)?;
    let mut from2_f = File::open(from)?;
    let mut out_f = File::create(output)?;

    let completely_different =
        reverse_diff(&mut diff_f, &mut from_f, &mut from2_f, &mut out_f, base_object_id)?;

    println!(
        "reverse-diffed {} against {} -> {} (completely_different={completely_different})",
        from.display(),
        diff.display(),
        output.display()
    );
    Ok(())
}

fn lock_cmd(path: &PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let mut lock = NamedLock::new();
    if lock.try_acquire(path, 0o600)? {
        println!("acquired lock at {}", path.display());
        lock.release()?;
        println!("released lock at {}", path.display());
    } else {
        println!("lock at {} is held by another process", path.display());
    }
    Ok(())
}
