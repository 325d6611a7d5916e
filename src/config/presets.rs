//! Bundled example configurations, shown by `--show-configs`.

/// Example config: one full-page template per label.
pub const SINGLE: &str = include_str!("../../configs/single.json");

/// Example config: grid of labels per template page.
pub const MULTIPLE: &str = include_str!("../../configs/multiple.json");

/// All bundled presets as (name, contents) pairs.
pub fn all() -> &'static [(&'static str, &'static str)] {
    &[("single", SINGLE), ("multiple", MULTIPLE)]
}
