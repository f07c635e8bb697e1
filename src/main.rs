use std::fs;
use std::path::PathBuf;

use clap::Parser;
use log::{info, LevelFilter};
use signpdf::wasm::structs::{resolve_placements, PlacementSpace, StampPlacement};
use signpdf::{stamp_signature, DocumentHandle, PageIndex, PdfEditor, SaveOptions, SignatureAsset};

/// Draw a PNG signature onto pages of a PDF document.
#[derive(Debug, Parser)]
#[command(name = "signpdf", about, version)]
struct Cli {
    /// Path to the PDF file
    #[arg(value_name = "FILE")]
    input: PathBuf,

    /// PNG image with the signature
    #[arg(long, short = 's')]
    signature: PathBuf,

    /// Page to sign (1-based), one per --rect
    #[arg(long, required = true)]
    page: Vec<u32>,

    /// Signature rectangle as X,Y,WIDTH,HEIGHT, one per --page
    #[arg(long, required = true, value_parser = parse_rect, allow_hyphen_values = true)]
    rect: Vec<[f32; 4]>,

    /// Read --rect as canvas pixels (origin top left) of a page rendered at
    /// this many pixels per point instead of PDF units (origin bottom left)
    #[arg(long)]
    canvas_scale: Option<f32>,

    /// Output file
    #[arg(long, short = 'o', default_value = "signed-document.pdf")]
    output: PathBuf,

    /// Store streams uncompressed
    #[arg(long)]
    no_compress: bool,

    /// Log progress to stderr, repeat for more detail
    #[arg(long, short = 'v', action = clap::ArgAction::Count)]
    verbose: u8,
}

fn parse_rect(s: &str) -> Result<[f32; 4], String> {
    let values = s
        .split(',')
        .map(|v| v.trim().parse::<f32>().map_err(|e| format!("'{v}': {e}")))
        .collect::<Result<Vec<_>, _>>()?;
    match values.as_slice() {
        [x, y, w, h] => Ok([*x, *y, *w, *h]),
        _ => Err(format!("expected X,Y,WIDTH,HEIGHT, got {} value(s)", values.len())),
    }
}

fn run(cli: Cli) -> Result<(), i32> {
    if cli.page.len() != cli.rect.len() {
        eprintln!(
            "Error: got {} --page and {} --rect arguments, they must come in pairs",
            cli.page.len(),
            cli.rect.len()
        );
        return Err(2);
    }

    let placements = cli
        .page
        .iter()
        .zip(&cli.rect)
        .map(|(page, [x, y, width, height])| StampPlacement {
            page: PageIndex(*page),
            x: *x,
            y: *y,
            width: *width,
            height: *height,
        })
        .collect::<Vec<_>>();
    let space = match cli.canvas_scale {
        Some(scale) => PlacementSpace::Canvas { scale },
        None => PlacementSpace::Document,
    };

    let read = |path: &PathBuf| {
        fs::read(path).map_err(|e| {
            eprintln!("Error reading {}: {e}", path.display());
            1
        })
    };
    let pdf = read(&cli.input)?;
    let signature = read(&cli.signature)?;

    let fail = |e: signpdf::SignError| {
        eprintln!("Error: {e}");
        1
    };
    let signature = SignatureAsset::from_bytes(&signature).map_err(fail)?;
    let doc = DocumentHandle::parse(pdf).map_err(fail)?;
    let resolved = resolve_placements(&doc, &placements, space).map_err(fail)?;
    for (page, rect) in &resolved {
        info!(
            "page {page}: x={:.1} y={:.1} width={:.1} height={:.1}",
            rect.x.0, rect.y.0, rect.width.0, rect.height.0
        );
    }

    let options = SaveOptions {
        compress: !cli.no_compress,
    };
    let bytes = stamp_signature::<PdfEditor>(doc.bytes(), &signature, &resolved, &options).map_err(fail)?;

    fs::write(&cli.output, &bytes).map_err(|e| {
        eprintln!("Error writing {}: {e}", cli.output.display());
        1
    })?;
    info!("wrote {}", cli.output.display());
    Ok(())
}

fn main() {
    let cli = Cli::parse();
    signpdf::logging::init(match cli.verbose {
        0 => LevelFilter::Warn,
        1 => LevelFilter::Info,
        _ => LevelFilter::Debug,
    });

    if let Err(code) = run(cli) {
        std::process::exit(code);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_parsing() {
        assert_eq!(parse_rect("66.5, 692,133.5,33.5"), Ok([66.5, 692.0, 133.5, 33.5]));
        assert_eq!(parse_rect("300,150,-200,-50"), Ok([300.0, 150.0, -200.0, -50.0]));
        assert!(parse_rect("1,2,3").is_err());
        assert!(parse_rect("1,2,3,x").is_err());
    }

    #[test]
    fn cli_accepts_repeated_pairs() {
        let cli = Cli::try_parse_from([
            "signpdf", "in.pdf", "-s", "sig.png", "--page", "1", "--rect", "1,2,3,4", "--page", "2",
            "--rect", "5,6,7,8", "--canvas-scale", "1.5", "-vv",
        ])
        .unwrap();
        assert_eq!(cli.page, vec![1, 2]);
        assert_eq!(cli.rect, vec![[1.0, 2.0, 3.0, 4.0], [5.0, 6.0, 7.0, 8.0]]);
        assert_eq!(cli.canvas_scale, Some(1.5));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.output, PathBuf::from("signed-document.pdf"));
    }
}
