//! Command-line parsing for `tessera-snapshot`.

use std::path::PathBuf;

use anyhow::{Context, bail};

pub const USAGE: &str = "\
Usage: tessera-snapshot [OPTIONS]

Options:
  --config FILE    Load render settings from a TOML file
  --driver NAME    Force a render driver (opengles, framebuffer, software)
  --size WxH       Window size in pixels [default: 320x240]
  --out FILE       Output PNG path [default: snapshot.png]
  --list-drivers   Print the driver table as JSON and exit
  -h, --help       Show this help";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
    pub config: Option<PathBuf>,
    pub driver: Option<String>,
    pub width: u32,
    pub height: u32,
    pub out: PathBuf,
    pub list_drivers: bool,
    pub help: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: None,
            driver: None,
            width: 320,
            height: 240,
            out: PathBuf::from("snapshot.png"),
            list_drivers: false,
            help: false,
        }
    }
}

impl Args {
    pub fn parse(args: impl IntoIterator<Item = String>) -> anyhow::Result<Self> {
        let mut out = Self::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => out.config = Some(PathBuf::from(value(&mut args, &arg)?)),
                "--driver" => out.driver = Some(value(&mut args, &arg)?),
                "--size" => {
                    let (w, h) = parse_size(&value(&mut args, &arg)?)?;
                    out.width = w;
                    out.height = h;
                }
                "--out" => out.out = PathBuf::from(value(&mut args, &arg)?),
                "--list-drivers" => out.list_drivers = true,
                "-h" | "--help" => out.help = true,
                other => bail!("unknown argument '{other}'\n\n{USAGE}"),
            }
        }
        Ok(out)
    }
}

fn value(args: &mut impl Iterator<Item = String>, flag: &str) -> anyhow::Result<String> {
    args.next()
        .with_context(|| format!("{flag} needs a value"))
}

/// Parse `WIDTHxHEIGHT`.
pub fn parse_size(text: &str) -> anyhow::Result<(u32, u32)> {
    let (w, h) = text
        .split_once(['x', 'X'])
        .with_context(|| format!("size '{text}' is not WIDTHxHEIGHT"))?;
    let w: u32 = w.trim().parse().with_context(|| format!("bad width in '{text}'"))?;
    let h: u32 = h.trim().parse().with_context(|| format!("bad height in '{text}'"))?;
    if w == 0 || h == 0 {
        bail!("size '{text}' must be non-zero");
    }
    Ok((w, h))
}
