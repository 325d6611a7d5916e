//! Layered settings resolution.
//!
//! Three layers fold left to right: built-in defaults, the config file,
//! the command line. A later layer only replaces a field it explicitly
//! sets. Validation runs once on the folded result and reports the first
//! missing or conflicting field.

use std::path::PathBuf;

use super::{
    CodePosition, CodeSpec, FileConfig, GridSpec, LogoSpec, Settings, TemplateType, TextSpec,
    parse_color, parse_delimiter,
};
use crate::error::LabelError;

/// Fields settable from the command line. `None` means "not given",
/// letting the file layer or the defaults show through. Boolean flags use
/// `Option<bool>` for the same reason: a flag the user did not pass must
/// not mask a `true` from the config file.
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub csv_file: Option<PathBuf>,
    pub output: Option<PathBuf>,
    pub width: Option<f32>,
    pub height: Option<f32>,
    pub margin: Option<f32>,
    pub dpi: Option<u32>,
    pub delimiter: Option<String>,
    pub dm_scale: Option<f32>,
    pub eac_image: Option<PathBuf>,
    pub eac_height: Option<f32>,
    pub no_pdf: Option<bool>,
    pub template: Option<PathBuf>,
    pub template_type: Option<String>,
    pub dm_position: Option<String>,
    pub dm_size: Option<f32>,
    pub dm_margin: Option<f32>,
    pub dm_x: Option<f32>,
    pub dm_y: Option<f32>,
    pub datamatrix_column: Option<usize>,
    pub no_eac: Option<bool>,
    pub no_product_name: Option<bool>,
    pub text_below_dm: Option<bool>,
    pub transparent_bg: Option<bool>,
    pub text_column: Option<usize>,
    pub text_start: Option<usize>,
    pub text_length: Option<usize>,
    pub text_font_size: Option<f32>,
    pub text_offset_x: Option<f32>,
    pub text_offset_y: Option<f32>,
    pub text_color: Option<String>,
    pub labels_horizontal: Option<u32>,
    pub labels_vertical: Option<u32>,
    pub label_width: Option<f32>,
    pub label_height: Option<f32>,
    pub label_margin_left: Option<f32>,
    pub label_margin_top: Option<f32>,
    pub label_spacing_horizontal: Option<f32>,
    pub label_spacing_vertical: Option<f32>,
}

/// Fold the three layers into an immutable [`Settings`] value.
///
/// Pure transformation: no filesystem access happens here, so resolution
/// failures always surface before any output is touched.
pub fn resolve(cli: CliOverrides, file: FileConfig) -> Result<Settings, LabelError> {
    let template_type = cli
        .template_type
        .or(file.template_type)
        .ok_or_else(|| LabelError::Config("template type is required (single|multiple)".into()))?;
    let template_type = TemplateType::parse(&template_type).ok_or_else(|| {
        LabelError::Config(format!(
            "invalid template type {template_type:?}, expected single or multiple"
        ))
    })?;

    let csv_file = cli
        .csv_file
        .or(file.csv_file.map(PathBuf::from))
        .ok_or_else(|| LabelError::Config("CSV input file is required".into()))?;
    let output = cli
        .output
        .or(file.output_pdf.map(PathBuf::from))
        .ok_or_else(|| LabelError::Config("output path is required".into()))?;

    // `template` and `template_pdf` are aliases in the file schema.
    let template = cli
        .template
        .or(file.template.map(PathBuf::from))
        .or(file.template_pdf.map(PathBuf::from));

    let delimiter = match cli.delimiter.or(file.delimiter) {
        None => b'\t',
        Some(s) => parse_delimiter(&s)
            .ok_or_else(|| LabelError::Config(format!("invalid delimiter {s:?}")))?,
    };

    let dm_position = match cli.dm_position.or(file.dm_position) {
        None => CodePosition::default(),
        Some(s) => CodePosition::parse(&s)
            .ok_or_else(|| LabelError::Config(format!("invalid code position {s:?}")))?,
    };

    let color = match cli.text_color.or(file.text_color) {
        None => [0, 0, 0],
        Some(s) => {
            parse_color(&s).ok_or_else(|| LabelError::Config(format!("invalid text color {s:?}")))?
        }
    };

    let dm_x = cli.dm_x.or(file.dm_x);
    let dm_y = cli.dm_y.or(file.dm_y);
    if dm_x.is_some() != dm_y.is_some() {
        return Err(LabelError::Config(
            "code position requires both dm_x and dm_y".into(),
        ));
    }

    let code = CodeSpec {
        x_mm: dm_x,
        y_mm: dm_y,
        position: dm_position,
        size_mm: cli.dm_size.or(file.dm_size).unwrap_or(15.0),
        margin_mm: cli.dm_margin.or(file.dm_margin).unwrap_or(2.0),
        scale: cli.dm_scale.or(file.dm_scale).unwrap_or(1.0),
        column: cli
            .datamatrix_column
            .or(file.datamatrix_column)
            .unwrap_or(0),
    };

    let no_eac = cli.no_eac.or(file.no_eac).unwrap_or(false);
    let no_product_name = cli.no_product_name.or(file.no_product_name).unwrap_or(false);
    let text_below_dm = cli.text_below_dm.or(file.text_below_dm).unwrap_or(false);
    let mut transparent_bg = cli.transparent_bg.or(file.transparent_bg).unwrap_or(false);

    // With the logo and the product name both disabled and no text below
    // the code, only the code itself is drawn; the background switches to
    // transparent so the template shows through.
    if no_eac && no_product_name && !text_below_dm && !transparent_bg {
        log::info!("logo and product name disabled, enabling transparent background");
        transparent_bg = true;
    }

    let text = TextSpec {
        column: cli.text_column.or(file.text_column),
        start: cli.text_start.or(file.text_start).unwrap_or(0),
        length: cli.text_length.or(file.text_length),
        font_size: cli.text_font_size.or(file.text_font_size).unwrap_or(12.0),
        offset_x_mm: cli.text_offset_x.or(file.text_offset_x).unwrap_or(5.0),
        offset_y_mm: cli.text_offset_y.or(file.text_offset_y).unwrap_or(0.0),
        color,
        below_code: text_below_dm,
        no_product_name,
    };

    let grid = match template_type {
        TemplateType::Single => None,
        TemplateType::Multiple => Some(GridSpec {
            columns: cli.labels_horizontal.or(file.labels_horizontal).unwrap_or(1),
            rows: cli.labels_vertical.or(file.labels_vertical).unwrap_or(1),
            cell_width_mm: cli.label_width.or(file.label_width),
            cell_height_mm: cli.label_height.or(file.label_height),
            margin_left_mm: cli
                .label_margin_left
                .or(file.label_margin_left)
                .unwrap_or(0.0),
            margin_top_mm: cli
                .label_margin_top
                .or(file.label_margin_top)
                .unwrap_or(0.0),
            spacing_h_mm: cli
                .label_spacing_horizontal
                .or(file.label_spacing_horizontal)
                .unwrap_or(0.0),
            spacing_v_mm: cli
                .label_spacing_vertical
                .or(file.label_spacing_vertical)
                .unwrap_or(0.0),
        }),
    };

    let settings = Settings {
        csv_file,
        output,
        page_width_mm: cli.width.or(file.width).unwrap_or(30.0),
        page_height_mm: cli.height.or(file.height).unwrap_or(20.0),
        margin_mm: cli.margin.or(file.margin).unwrap_or(2.0),
        dpi: cli.dpi.or(file.dpi).unwrap_or(300),
        delimiter,
        template,
        template_type,
        code,
        text,
        grid,
        logo: LogoSpec {
            path: cli
                .eac_image
                .or(file.eac_image.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from("eac.png")),
            height_mm: cli.eac_height.or(file.eac_height).unwrap_or(5.0),
            enabled: !no_eac,
        },
        no_pdf: cli.no_pdf.or(file.no_pdf).unwrap_or(false),
        transparent_bg,
    };

    validate(&settings)?;
    Ok(settings)
}

/// Cross-field validation on the folded result.
fn validate(settings: &Settings) -> Result<(), LabelError> {
    if settings.dpi == 0 {
        return Err(LabelError::Config("dpi must be positive".into()));
    }
    if settings.code.size_mm <= 0.0 {
        return Err(LabelError::Config("code size must be positive".into()));
    }
    if settings.code.scale <= 0.0 {
        return Err(LabelError::Config("code scale must be positive".into()));
    }

    if let Some(grid) = &settings.grid {
        if grid.columns == 0 || grid.rows == 0 {
            return Err(LabelError::Config(
                "grid requires at least one label per row and column".into(),
            ));
        }
        if settings.code.x_mm.is_none() {
            return Err(LabelError::Config(
                "code position (dm_x, dm_y) is required for template_type=multiple".into(),
            ));
        }
        if settings.template.is_none() {
            return Err(LabelError::Config(
                "a template is required for template_type=multiple".into(),
            ));
        }
        if let (Some(w), Some(h)) = (grid.cell_width_mm, grid.cell_height_mm)
            && (w <= 0.0 || h <= 0.0)
        {
            return Err(LabelError::Config("label cell size must be positive".into()));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_cli() -> CliOverrides {
        CliOverrides {
            csv_file: Some(PathBuf::from("data.csv")),
            output: Some(PathBuf::from("out.pdf")),
            template_type: Some("single".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_defaults_fill_unset_fields() {
        let settings = resolve(minimal_cli(), FileConfig::default()).unwrap();
        assert_eq!(settings.dpi, 300);
        assert_eq!(settings.margin_mm, 2.0);
        assert_eq!(settings.code.size_mm, 15.0);
        assert_eq!(settings.delimiter, b'\t');
        assert_eq!(settings.code.position, CodePosition::BottomRight);
        assert!(settings.grid.is_none());
    }

    #[test]
    fn test_cli_wins_over_file() {
        let mut cli = minimal_cli();
        cli.dpi = Some(600);
        let file = FileConfig {
            dpi: Some(150),
            dm_size: Some(10.0),
            ..Default::default()
        };
        let settings = resolve(cli, file).unwrap();
        assert_eq!(settings.dpi, 600); // CLI overrides file
        assert_eq!(settings.code.size_mm, 10.0); // file overrides default
    }

    #[test]
    fn test_missing_template_type_is_first_error() {
        let cli = CliOverrides {
            csv_file: Some(PathBuf::from("data.csv")),
            output: Some(PathBuf::from("out.pdf")),
            ..Default::default()
        };
        let err = resolve(cli, FileConfig::default()).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("template type"), "got: {msg}");
    }

    #[test]
    fn test_multiple_requires_code_position() {
        let mut cli = minimal_cli();
        cli.template_type = Some("multiple".into());
        cli.template = Some(PathBuf::from("template.pdf"));
        let err = resolve(cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("dm_x"));
    }

    #[test]
    fn test_dm_x_without_dm_y_conflicts() {
        let mut cli = minimal_cli();
        cli.dm_x = Some(10.0);
        let err = resolve(cli, FileConfig::default()).unwrap_err();
        assert!(err.to_string().contains("dm_y"));
    }

    #[test]
    fn test_multiple_grid_resolved() {
        let mut cli = minimal_cli();
        cli.template_type = Some("multiple".into());
        cli.template = Some(PathBuf::from("template.pdf"));
        cli.dm_x = Some(5.0);
        cli.dm_y = Some(3.0);
        cli.labels_horizontal = Some(3);
        cli.labels_vertical = Some(6);
        let settings = resolve(cli, FileConfig::default()).unwrap();
        let grid = settings.grid.unwrap();
        assert_eq!(grid.capacity(), 18);
    }

    #[test]
    fn test_auto_transparent_background() {
        let mut cli = minimal_cli();
        cli.no_eac = Some(true);
        cli.no_product_name = Some(true);
        let settings = resolve(cli, FileConfig::default()).unwrap();
        assert!(settings.transparent_bg);
        assert!(!settings.logo.enabled);
    }
}
