use clap::Parser;

use crate::config::{ExportShape, NameConvention};

/// Generate TypeScript declaration files for CSS/SCSS modules.
///
/// Every stylesheet matched by PATTERN gets a sibling `.d.ts` file (or one under
/// `--output`) that types its locally-scoped class names.
#[derive(Parser, Debug)]
#[command(name = "css-modules-dts", version, about, long_about = None)]
pub struct Cli {
    /// Glob pattern selecting stylesheets (e.g. "src/**/*.module.scss").
    pub pattern: String,

    /// Output location: "auto" writes next to each source, anything else is a directory.
    #[arg(short, long, value_name = "auto|DIR")]
    pub output: Option<String>,

    /// Keep running and regenerate declarations as stylesheets change.
    #[arg(short, long)]
    pub watch: bool,

    /// Shape of the generated declarations [default: default].
    #[arg(short, long, value_enum)]
    pub export_type: Option<ExportShape>,

    /// Naming convention for class-name keys [default: camelCase].
    #[arg(short, long, value_enum)]
    pub name_format: Option<NameConvention>,

    /// Print stage-by-stage diagnostics.
    #[arg(short, long)]
    pub debug: bool,

    /// Print the batch summary as JSON instead of human-readable text.
    #[arg(long)]
    pub json: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_positional_pattern_and_flags() {
        let cli = Cli::parse_from([
            "css-modules-dts",
            "src/**/*.module.scss",
            "-w",
            "-e",
            "named",
            "-n",
            "original",
        ]);
        assert_eq!(cli.pattern, "src/**/*.module.scss");
        assert!(cli.watch);
        assert_eq!(cli.export_type, Some(ExportShape::Named));
        assert_eq!(cli.name_format, Some(NameConvention::Original));
        assert!(cli.output.is_none());
    }

    #[test]
    fn test_pattern_is_required() {
        assert!(Cli::try_parse_from(["css-modules-dts"]).is_err());
    }
}
