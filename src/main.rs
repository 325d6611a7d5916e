//! # Labelgen CLI
//!
//! Command-line interface for label sheet generation.
//!
//! ## Usage
//!
//! ```bash
//! # One label per template page
//! labelgen codes.csv labels.pdf --template-type single --template blank.pdf
//!
//! # 3x8 grid on an A4 template sheet
//! labelgen codes.csv sheet.pdf --template-type multiple --template a4.pdf \
//!     --labels-horizontal 3 --labels-vertical 8 --dm-x 5 --dm-y 3
//!
//! # Everything from a config file, output target overridden
//! labelgen --config single.json codes.csv labels.pdf
//!
//! # Print the bundled example configs
//! labelgen --show-configs
//! ```

use clap::Parser;
use std::path::PathBuf;

use labelgen::LabelError;
use labelgen::config::{self, CliOverrides, FileConfig};
use labelgen::pipeline;

/// Labelgen - CSV-driven label sheet generator
#[derive(Parser, Debug)]
#[command(name = "labelgen")]
#[command(author, version, about, long_about = None)]
#[command(disable_version_flag = true)]
struct Cli {
    /// Print version and exit
    #[arg(short = 'v', long = "version", action = clap::ArgAction::Version)]
    version: Option<bool>,

    /// CSV file with one record per label
    csv_file: Option<PathBuf>,

    /// Output PDF path
    output: Option<PathBuf>,

    /// JSON or INI config file; command-line flags override it
    #[arg(short, long, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Print the bundled example configs and exit
    #[arg(long)]
    show_configs: bool,

    /// Template layout: single (one label per page) or multiple (grid)
    #[arg(long, value_name = "TYPE")]
    template_type: Option<String>,

    /// Template PDF or image file; omit for blank pages
    #[arg(short, long, value_name = "FILE")]
    template: Option<PathBuf>,

    /// Page width in mm (blank pages only)
    #[arg(short = 'W', long)]
    width: Option<f32>,

    /// Page height in mm (blank pages only)
    #[arg(short = 'H', long)]
    height: Option<f32>,

    /// Label margin in mm
    #[arg(short, long)]
    margin: Option<f32>,

    /// Rasterization resolution for blank and image pages
    #[arg(short, long)]
    dpi: Option<u32>,

    /// CSV field delimiter ("\t" or a single character)
    #[arg(long, value_name = "CHAR")]
    delimiter: Option<String>,

    /// Code size in mm
    #[arg(long, visible_alias = "ds")]
    dm_size: Option<f32>,

    /// Scale factor applied to the code size
    #[arg(long)]
    dm_scale: Option<f32>,

    /// Margin between the code and the label edge in mm
    #[arg(long)]
    dm_margin: Option<f32>,

    /// Corner the code anchors to (bottom-right, bottom-left, top-right,
    /// top-left)
    #[arg(long, value_name = "CORNER")]
    dm_position: Option<String>,

    /// Code x position in mm from the cell's left edge; requires --dm-y
    #[arg(long, visible_alias = "dx")]
    dm_x: Option<f32>,

    /// Code y position in mm from the cell's top edge; requires --dm-x
    #[arg(long, visible_alias = "dy")]
    dm_y: Option<f32>,

    /// 0-based CSV column holding the code payload
    #[arg(long, visible_alias = "dc")]
    datamatrix_column: Option<usize>,

    /// 0-based CSV column for the label text
    #[arg(long, visible_alias = "tc")]
    text_column: Option<usize>,

    /// First character of the text fragment
    #[arg(long, visible_alias = "ts")]
    text_start: Option<usize>,

    /// Length of the text fragment; omit for the rest of the field
    #[arg(long, visible_alias = "tl")]
    text_length: Option<usize>,

    /// Text size in points
    #[arg(long, visible_alias = "tfs")]
    text_font_size: Option<f32>,

    /// Text x offset from the code in mm
    #[arg(long, visible_alias = "tox")]
    text_offset_x: Option<f32>,

    /// Text y offset in mm
    #[arg(long, visible_alias = "toy")]
    text_offset_y: Option<f32>,

    /// Text color: a named color or #rrggbb
    #[arg(long, visible_alias = "tcl", value_name = "COLOR")]
    text_color: Option<String>,

    /// Draw the short code centered below the code
    #[arg(long)]
    text_below_dm: bool,

    /// Skip the product name text
    #[arg(long)]
    no_product_name: bool,

    /// Logo image file
    #[arg(long, value_name = "FILE")]
    eac_image: Option<PathBuf>,

    /// Logo height in mm
    #[arg(long)]
    eac_height: Option<f32>,

    /// Skip the logo
    #[arg(long)]
    no_eac: bool,

    /// Compose labels on a transparent background
    #[arg(long)]
    transparent_bg: bool,

    /// Write page PNGs and an HTML preview instead of a PDF
    #[arg(long)]
    no_pdf: bool,

    /// Labels per row (multiple mode)
    #[arg(long)]
    labels_horizontal: Option<u32>,

    /// Label rows per page (multiple mode)
    #[arg(long)]
    labels_vertical: Option<u32>,

    /// Grid cell width in mm; derived from the page when omitted
    #[arg(long)]
    label_width: Option<f32>,

    /// Grid cell height in mm; derived from the page when omitted
    #[arg(long)]
    label_height: Option<f32>,

    /// Grid left margin in mm
    #[arg(long)]
    label_margin_left: Option<f32>,

    /// Grid top margin in mm
    #[arg(long)]
    label_margin_top: Option<f32>,

    /// Horizontal gap between grid cells in mm
    #[arg(long)]
    label_spacing_horizontal: Option<f32>,

    /// Vertical gap between grid cells in mm
    #[arg(long)]
    label_spacing_vertical: Option<f32>,
}

impl Cli {
    fn into_overrides(self) -> (Option<PathBuf>, CliOverrides) {
        let flag = |set: bool| set.then_some(true);
        let overrides = CliOverrides {
            csv_file: self.csv_file,
            output: self.output,
            width: self.width,
            height: self.height,
            margin: self.margin,
            dpi: self.dpi,
            delimiter: self.delimiter,
            dm_scale: self.dm_scale,
            eac_image: self.eac_image,
            eac_height: self.eac_height,
            no_pdf: flag(self.no_pdf),
            template: self.template,
            template_type: self.template_type,
            dm_position: self.dm_position,
            dm_size: self.dm_size,
            dm_margin: self.dm_margin,
            dm_x: self.dm_x,
            dm_y: self.dm_y,
            datamatrix_column: self.datamatrix_column,
            no_eac: flag(self.no_eac),
            no_product_name: flag(self.no_product_name),
            text_below_dm: flag(self.text_below_dm),
            transparent_bg: flag(self.transparent_bg),
            text_column: self.text_column,
            text_start: self.text_start,
            text_length: self.text_length,
            text_font_size: self.text_font_size,
            text_offset_x: self.text_offset_x,
            text_offset_y: self.text_offset_y,
            text_color: self.text_color,
            labels_horizontal: self.labels_horizontal,
            labels_vertical: self.labels_vertical,
            label_width: self.label_width,
            label_height: self.label_height,
            label_margin_left: self.label_margin_left,
            label_margin_top: self.label_margin_top,
            label_spacing_horizontal: self.label_spacing_horizontal,
            label_spacing_vertical: self.label_spacing_vertical,
        };
        (self.config, overrides)
    }
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

fn run() -> Result<(), LabelError> {
    let cli = Cli::parse();

    if cli.show_configs {
        for (name, contents) in config::presets::all() {
            println!("# {name}");
            println!("{contents}");
        }
        return Ok(());
    }

    let (config_path, overrides) = cli.into_overrides();
    let file = match config_path {
        Some(path) => FileConfig::load(&path)?,
        None => FileConfig::default(),
    };
    let settings = config::resolve(overrides, file)?;

    let summary = pipeline::run(&settings)?;
    println!(
        "{} labels on {} pages ({} of {} rows skipped)",
        summary.labels, summary.pages, summary.skipped, summary.rows_read
    );
    Ok(())
}
