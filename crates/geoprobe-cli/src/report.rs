//! Console presentation of status events and result trees.

use async_channel::Receiver;
use geoprobe::{ObjectNode, Status, TreeView, format_remaining};

use crate::args::TreeArgs;

/// The console line for a status event, if it has one.
pub fn status_line(status: &Status) -> Option<String> {
    match status {
        Status::UrlResolved(url) => Some(format!("Request URL: {url}")),
        Status::Progress(Some(remaining)) => {
            Some(format!("Time remaining: {}", format_remaining(*remaining)))
        }
        Status::Progress(None) => None,
        Status::Completed { duration_ms } => Some(format!("Processing time: {duration_ms} ms")),
    }
}

/// Print status events until every sender is gone.
pub async fn print_status(status: Receiver<Status>) {
    while let Ok(event) = status.recv().await {
        if let Some(line) = status_line(&event) {
            eprintln!("{line}");
        }
    }
}

/// Render a result tree expanded as requested.
pub fn render_tree(root: ObjectNode, args: TreeArgs) -> String {
    let mut view = TreeView::new(root);
    if args.all {
        view.expand_all();
    } else {
        view.expand_to_depth(args.depth);
    }
    view.render()
}

#[cfg(test)]
mod tests {
    use geoprobe::materialize;
    use serde_json::json;

    use super::*;

    #[test]
    fn test_status_lines() {
        assert_eq!(
            status_line(&Status::UrlResolved("https://example.com/x".to_string())).unwrap(),
            "Request URL: https://example.com/x"
        );
        assert_eq!(
            status_line(&Status::Progress(Some(65))).unwrap(),
            "Time remaining: 00:01:05"
        );
        assert_eq!(status_line(&Status::Progress(None)), None);
        assert_eq!(
            status_line(&Status::Completed { duration_ms: 412 }).unwrap(),
            "Processing time: 412 ms"
        );
    }

    #[test]
    fn test_render_tree_depth() {
        let root = materialize("result", &json!({"a": {"b": {"c": 1}}}));

        let shallow = render_tree(root.clone(), TreeArgs { depth: 1, all: false });
        assert_eq!(shallow.lines().count(), 2);

        let full = render_tree(root, TreeArgs { depth: 0, all: true });
        assert_eq!(full.lines().last().unwrap().trim(), "c: 1");
    }
}
