pub mod approot;
pub mod outfmt;

// Override the version in Cargo.toml. Version is of the format 0.YY.MM[.i]
// (year.month.optional_minor_increment), which gives a more immediate
// reference for when the app was last updated than semver would.
pub const B3NOTES_APP_VERSION: &str = "0.25.08";
