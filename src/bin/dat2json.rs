use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use log::info;
use serde::Serialize;
use serde_json::ser::PrettyFormatter;

use datkit::formats::dat::{DatFile, NodeData};

/// Dump Melee .dat fighter files to JSON
#[derive(Debug, Parser)]
#[command(version, about)]
struct Args {
    /// The .dat file
    datfile: PathBuf,

    /// Output JSON path [default: <datfile> with a .json extension]
    #[arg(short, long)]
    out: Option<PathBuf>,

    /// Companion animation archive [default: <datfile stem>AJ.dat]
    #[arg(short, long)]
    animfile: Option<PathBuf>,

    /// Write every subaction's animation to its own file in DIR
    #[arg(
        long,
        value_name = "DIR",
        num_args = 0..=1,
        default_missing_value = "animationFiles"
    )]
    dumpanims: Option<PathBuf>,

    /// Log how long reading, decoding and writing take
    #[arg(long)]
    timing: bool,
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let (file, anim) = timed(args.timing, "read", || read_inputs(&args))?;
    let dat = timed(args.timing, "decode", || DatFile::parse(&file, anim.as_deref()))
        .with_context(|| format!("failed to decode {}", args.datfile.display()))?;

    if let Some(dir) = &args.dumpanims {
        let Some(anim) = &anim else {
            bail!("--dumpanims needs the animation archive (see --animfile)");
        };
        dump_animations(&dat, anim, dir)?;
    }

    let out = args
        .out
        .clone()
        .unwrap_or_else(|| args.datfile.with_extension("json"));
    info!("saving to {}", out.display());
    timed(args.timing, "write", || write_json(&dat, &out))?;

    Ok(())
}

fn read_inputs(args: &Args) -> Result<(Vec<u8>, Option<Vec<u8>>)> {
    let file = fs::read(&args.datfile)
        .with_context(|| format!("failed to read {}", args.datfile.display()))?;

    let anim_path = args
        .animfile
        .clone()
        .unwrap_or_else(|| default_anim_path(&args.datfile));
    let anim = if anim_path.is_file() {
        Some(
            fs::read(&anim_path)
                .with_context(|| format!("failed to read {}", anim_path.display()))?,
        )
    } else {
        info!("animation archive not found at {}", anim_path.display());
        info!("pass --animfile to point at the Pl**AJ.dat file directly");
        None
    };

    Ok((file, anim))
}

/// `PlFx.dat` -> `PlFxAJ.dat`, next to the input.
fn default_anim_path(datfile: &Path) -> PathBuf {
    let stem = datfile.file_stem().unwrap_or_default().to_string_lossy();
    datfile.with_file_name(format!("{stem}AJ.dat"))
}

fn dump_animations(dat: &DatFile, anim: &[u8], dir: &Path) -> Result<()> {
    let Some(NodeData::FighterData(ft)) = dat.root_nodes.first().map(|n| &n.data) else {
        bail!("--dumpanims needs a file whose first root node is fighter data");
    };

    fs::create_dir_all(dir).with_context(|| format!("failed to create {}", dir.display()))?;
    for (i, sub) in ft.subactions.iter().enumerate() {
        let mut name = i.to_string();
        if !sub.name.is_empty() {
            name.push_str(" - ");
            name.push_str(&sub.short_name);
        }
        let path = dir.join(format!("{name}.dat"));
        fs::write(&path, sub.animation_bytes(anim)?)
            .with_context(|| format!("failed to write {}", path.display()))?;
    }
    info!(
        "wrote {} animations to {}",
        ft.subactions.len(),
        dir.display()
    );
    Ok(())
}

fn write_json(dat: &DatFile, out: &Path) -> Result<()> {
    let file = File::create(out).with_context(|| format!("failed to create {}", out.display()))?;
    let mut w = BufWriter::new(file);
    let mut ser = serde_json::Serializer::with_formatter(&mut w, PrettyFormatter::with_indent(b"    "));
    dat.serialize(&mut ser)?;
    w.flush()?;
    Ok(())
}

fn timed<T>(enabled: bool, phase: &str, f: impl FnOnce() -> T) -> T {
    let start = Instant::now();
    let result = f();
    if enabled {
        info!("{phase}: {:.3?}", start.elapsed());
    }
    result
}
