use crate::CLAP_STYLING;
use clap::{arg, command};
use firstlink_scanner::selector::WIKIPEDIA_ROOT;
use url::Url;

fn start_page_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(-u --"url" <URL>)
            .required(false)
            .help("The page to start from (default: the Java programming language article)")
            .value_parser(clap::value_parser!(Url))
            .conflicts_with("title"),
    )
    .arg(
        arg!(-t --"title" <TITLE>)
            .required(false)
            .help("Article title to start from, e.g. \"Ancient Greece\"")
            .conflicts_with("url"),
    )
    .arg(
        arg!(--"site-root" <URL>)
            .required(false)
            .help("Prefix joined to every followed link")
            .default_value(WIKIPEDIA_ROOT),
    )
    .arg(
        arg!(--"timeout" <SECONDS>)
            .required(false)
            .help("Request timeout in seconds")
            .value_parser(clap::value_parser!(u64))
            .default_value("10"),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("firstlink")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("firstlink")
        .styles(CLAP_STYLING)
        .arg(arg!(-q --"quiet" "Suppress banner, progress and non-essential output").required(false))
        .arg(arg!(-v --"verbose" "Log every link decision (overridden by RUST_LOG)").required(false))
        .subcommand_required(false)
        .subcommand(
            start_page_args(command!("walk"))
                .about(
                    "Follow the first valid link of each page until reaching the target, a dead \
                end, a missing page or a loop.",
                )
                .arg(
                    arg!(--"target" <URL>)
                        .required(false)
                        .help("The page that ends the walk successfully (default: Philosophy under --site-root)"),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Also save the report to a file"),
                ),
        )
        .subcommand(
            start_page_args(command!("first"))
                .about("Print the link a walk would follow from a single page, without following it"),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use firstlink::handlers::{handle_walk, walk_options_from_args};
    use firstlink_core::walk::PHILOSOPHY_URL;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[test]
    fn test_walk_defaults() {
        let matches = command_argument_builder().get_matches_from(["firstlink", "walk"]);
        let (name, sub) = matches.subcommand().unwrap();
        assert_eq!(name, "walk");

        let options = walk_options_from_args(sub, true);
        assert_eq!(options.start_url, "https://en.wikipedia.org/wiki/Java_(programming_language)");
        assert_eq!(options.target_url, PHILOSOPHY_URL);
        assert_eq!(options.site_root, WIKIPEDIA_ROOT);
        assert_eq!(options.timeout_secs, 10);
        assert!(!options.show_progress);
    }

    #[test]
    fn test_walk_with_title_and_target() {
        let matches = command_argument_builder().get_matches_from([
            "firstlink",
            "-q",
            "walk",
            "--title",
            "Ancient Greece",
            "--target",
            "https://en.wikipedia.org/wiki/Logic",
            "--timeout",
            "3",
            "-f",
            "json",
        ]);
        assert!(matches.get_flag("quiet"));
        let sub = matches.subcommand_matches("walk").unwrap();

        let options = walk_options_from_args(sub, false);
        assert_eq!(options.start_url, "https://en.wikipedia.org/wiki/Ancient_Greece");
        assert_eq!(options.target_url, "https://en.wikipedia.org/wiki/Logic");
        assert_eq!(options.timeout_secs, 3);
        assert!(options.show_progress);
        assert_eq!(sub.get_one::<String>("format").map(String::as_str), Some("json"));
    }

    #[test]
    fn test_url_conflicts_with_title() {
        let result = command_argument_builder().try_get_matches_from([
            "firstlink",
            "walk",
            "--url",
            "https://en.wikipedia.org/wiki/Logic",
            "--title",
            "Logic",
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn test_first_has_no_target() {
        let matches = command_argument_builder().get_matches_from([
            "firstlink",
            "first",
            "-u",
            "https://en.wikipedia.org/wiki/Logic",
        ]);
        let sub = matches.subcommand_matches("first").unwrap();

        let options = walk_options_from_args(sub, true);
        assert_eq!(options.start_url, "https://en.wikipedia.org/wiki/Logic");
        assert_eq!(options.target_url, PHILOSOPHY_URL);
    }

    #[test]
    fn test_trailing_slash_site_root_is_normalised() {
        let matches = command_argument_builder().get_matches_from([
            "firstlink",
            "walk",
            "--site-root",
            "https://en.wikipedia.org/",
            "--title",
            "Logic",
        ]);
        let sub = matches.subcommand_matches("walk").unwrap();

        let options = walk_options_from_args(sub, true);
        assert_eq!(options.site_root, WIKIPEDIA_ROOT);
        assert_eq!(options.start_url, "https://en.wikipedia.org/wiki/Logic");
        assert_eq!(options.target_url, PHILOSOPHY_URL);

        let finder = options.path_finder().unwrap();
        assert_eq!(finder.target_url(), PHILOSOPHY_URL);
    }

    #[test]
    fn test_default_target_follows_site_root() {
        let matches = command_argument_builder().get_matches_from([
            "firstlink",
            "walk",
            "--site-root",
            "http://localhost:8080/",
            "--title",
            "Start",
        ]);
        let sub = matches.subcommand_matches("walk").unwrap();

        let options = walk_options_from_args(sub, true);
        assert_eq!(options.site_root, "http://localhost:8080");
        assert_eq!(options.start_url, "http://localhost:8080/wiki/Start");
        assert_eq!(options.target_url, "http://localhost:8080/wiki/Philosophy");
    }

    fn article(body: &str) -> ResponseTemplate {
        ResponseTemplate::new(200)
            .insert_header("content-type", "text/html; charset=UTF-8")
            .set_body_bytes(format!(
                r#"<html><body><div id="mw-content-text"><p>{}</p></div></body></html>"#,
                body
            ))
    }

    #[tokio::test]
    async fn test_handle_walk_writes_json_report() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/wiki/Start"))
            .respond_with(article(r#"A <a href="/wiki/Philosophy">branch of knowledge</a>."#))
            .mount(&server)
            .await;

        let temp_dir = tempfile::tempdir().unwrap();
        let report_path = temp_dir.path().join("walk.json");
        let site_root = format!("{}/", server.uri());
        let output = report_path.to_string_lossy().to_string();

        let matches = command_argument_builder().get_matches_from([
            "firstlink",
            "-q",
            "walk",
            "--site-root",
            site_root.as_str(),
            "--title",
            "start",
            "-f",
            "json",
            "-o",
            output.as_str(),
        ]);
        let sub = matches.subcommand_matches("walk").unwrap();

        let reached = handle_walk(sub, true).await.unwrap();
        assert!(reached);

        let report = std::fs::read_to_string(&report_path).unwrap();
        let json: serde_json::Value = serde_json::from_str(&report).unwrap();
        assert_eq!(json["outcome"], "reached_target");
        assert_eq!(json["path"][0], format!("{}/wiki/Start", server.uri()));
        assert_eq!(json["path"][1], format!("{}/wiki/Philosophy", server.uri()));
    }
}
