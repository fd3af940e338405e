pub mod report;
pub mod walk;

pub use walk::{execute_walk, Outcome, PathFinder, Walk, WalkOptions};

pub fn print_banner() {
    eprintln!(
        r#"
  ┌─┐┬┬─┐┌─┐┌┬┐┬  ┬┌┐┌┬┌─
  ├┤ │├┬┘└─┐ │ │  ││││├┴┐
  └  ┴┴└─└─┘ ┴ ┴─┘┴┘└┘┴ ┴  v{}
"#,
        env!("CARGO_PKG_VERSION")
    );
}
