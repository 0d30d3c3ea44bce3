//! End-to-end tests for loading and rendering through an environment.

use std::sync::Arc;

use serde_json::{json, Value};
use stratum::loader::MemoryLoader;
use stratum::resolve::{Node, ResolveHook};
use stratum::{Environment, TemplateError};

fn view_loader() -> MemoryLoader {
    MemoryLoader::from_templates([
        (
            "@main/view.html",
            r#"{{extends "layout.html"}}{{define "content"}}{{template "title.html"}}{{template "subtitle.html"}}{{end}}"#,
        ),
        ("@main/layout.html", r#"<body>{{block "content" .}}{{end}}</body>"#),
        ("@main/title.html", "<h1>Title Test</h1>"),
        ("@main/subtitle.html", "<h2>Subtitle Test</h2>"),
    ])
}

#[test]
fn renders_extended_view_with_includes() {
    let env = Environment::new(Arc::new(view_loader()));
    let view = env.load("@main/view.html").unwrap();

    assert_eq!(
        view.render(&Value::Null).unwrap(),
        "<body><h1>Title Test</h1><h2>Subtitle Test</h2></body>"
    );
}

#[test]
fn compiled_set_names() {
    let env = Environment::new(Arc::new(view_loader()));
    let view = env.load("@main/view.html").unwrap();
    let set = view.template_set().unwrap();

    assert_eq!(set.name(), "@main/view.html");
    for name in [
        "@main/view.html",
        "@main/child_view.html",
        "@main/title.html",
        "@main/subtitle.html",
        "content",
    ] {
        assert!(set.contains(name), "missing {name}");
    }
    assert!(!set.contains("@main/layout.html"));
}

#[test]
fn load_scenarios_repeat_consistently() {
    let env = Environment::new(Arc::new(view_loader()));

    for _ in 0..2 {
        assert!(env.load("no-view.html").unwrap_err().is_not_found());
        assert!(env.load("@main/no-view.html").unwrap_err().is_not_found());

        let view = env.load("@main/view.html").unwrap();
        assert_eq!(view.name(), "@main/view.html");
        let layout = env.load("@main/layout.html").unwrap();
        assert_eq!(layout.render(&Value::Null).unwrap(), "<body></body>");
    }
}

#[test]
fn missing_include_fails_the_load() {
    let loader = view_loader();
    loader.add(
        "@main/view.html",
        r#"{{extends "layout.html"}}{{define "content"}}{{template "gone.html"}}{{end}}"#,
    );
    let env = Environment::new(Arc::new(loader));

    let err = env.load("@main/view.html").unwrap_err();
    assert!(err.is_not_found());
    assert!(err.to_string().contains("@main/gone.html"));
}

#[test]
fn delimiter_change_yields_new_wrapper() {
    let env = Environment::new(Arc::new(view_loader()));
    let first = env.load("@main/layout.html").unwrap();
    let again = env.load("@main/layout.html").unwrap();
    assert!(Arc::ptr_eq(&first, &again));

    env.set_delims("{{", "}}").unwrap();
    let same_delims = env.load("@main/layout.html").unwrap();
    assert!(!Arc::ptr_eq(&first, &same_delims));

    env.set_delims("[[", "]]").unwrap();
    let other = env.load("@main/layout.html").unwrap();
    assert!(!Arc::ptr_eq(&same_delims, &other));
}

#[test]
fn multi_level_inheritance() {
    let loader = MemoryLoader::from_templates([
        (
            "base.html",
            r#"<html>{{block "head" .}}<title>{{ .title }}</title>{{end}}{{block "body" .}}{{end}}</html>"#,
        ),
        (
            "section.html",
            r#"{{extends "base.html"}}{{define "body"}}<section>{{block "main" .}}{{end}}</section>{{end}}"#,
        ),
        (
            "page.html",
            r#"{{extends "section.html"}}{{define "main"}}<p>{{ .text }}</p>{{end}}"#,
        ),
    ]);
    let env = Environment::new(Arc::new(loader));

    let page = env.load("page.html").unwrap();
    assert_eq!(
        page.render(&json!({"title": "T", "text": "hello"})).unwrap(),
        "<html><title>T</title><section><p>hello</p></section></html>"
    );
    assert_eq!(
        page.tracked_names(),
        vec!["base.html", "page.html", "section.html"]
    );
}

#[test]
fn included_template_can_extend() {
    let loader = MemoryLoader::from_templates([
        ("card.html", r#"<div>{{block "inner" .}}card{{end}}</div>"#),
        (
            "widget.html",
            r#"{{extends "card.html"}}{{define "inner"}}widget{{end}}"#,
        ),
        ("page.html", r#"[{{template "widget.html" .}}]"#),
    ]);
    let env = Environment::new(Arc::new(loader));

    let page = env.load("page.html").unwrap();
    assert_eq!(page.render(&Value::Null).unwrap(), "[<div>widget</div>]");
    assert!(page
        .tracked_names()
        .contains(&"card.html".to_string()));
}

#[test]
fn globals_provide_shared_defines() {
    let loader = view_loader();
    loader.add(
        "@main/macros.html",
        r#"{{define "year"}}2024{{end}}"#,
    );
    loader.add(
        "@main/footer.html",
        r#"{{extends "layout.html"}}{{define "content"}}(c) {{block "year" .}}{{end}}{{end}}"#,
    );
    let env = Environment::new(Arc::new(loader));
    env.set_globals(["macros.html"]);

    let footer = env.load("@main/footer.html").unwrap();
    assert_eq!(
        footer.render(&Value::Null).unwrap(),
        "<body>(c) 2024</body>"
    );
}

#[test]
fn circular_extends_is_an_error() {
    let loader = MemoryLoader::from_templates([
        ("a.html", r#"{{extends "b.html"}}"#),
        ("b.html", r#"{{extends "a.html"}}"#),
    ]);
    let env = Environment::new(Arc::new(loader));

    let err = env.load("a.html").unwrap_err();
    match err {
        TemplateError::CircularExtends { cycle } => {
            assert_eq!(cycle, "a.html → b.html → a.html")
        }
        other => panic!("expected cycle, got {other}"),
    }
}

#[test]
fn hooks_can_reject_templates() {
    let hook = |node: &mut Node, _namespace: Option<&str>| -> anyhow::Result<()> {
        anyhow::ensure!(
            !node.name.ends_with("subtitle.html"),
            "subtitles are disabled"
        );
        Ok(())
    };
    let hook: Arc<dyn ResolveHook> = Arc::new(hook);
    let env = Environment::new(Arc::new(view_loader())).with_hooks([hook]);

    let err = env.load("@main/view.html").unwrap_err();
    assert!(matches!(err, TemplateError::Hook { ref name, .. } if name == "@main/subtitle.html"));
    assert!(env.load("@main/title.html").is_ok());
}

#[test]
fn hooks_can_rewrite_sources() {
    let hook = |node: &mut Node, _namespace: Option<&str>| -> anyhow::Result<()> {
        if node.name == "@main/title.html" {
            node.source.code = b"<h1>Rewritten</h1>".to_vec().into();
        }
        Ok(())
    };
    let env = Environment::new(Arc::new(view_loader()));
    env.add_hook(Arc::new(hook));

    let view = env.load("@main/view.html").unwrap();
    assert_eq!(
        view.render(&Value::Null).unwrap(),
        "<body><h1>Rewritten</h1><h2>Subtitle Test</h2></body>"
    );
}

#[test]
fn shared_across_threads() {
    let env = Arc::new(Environment::new(Arc::new(view_loader())));

    let handles: Vec<_> = (0..4)
        .map(|_| {
            let env = Arc::clone(&env);
            std::thread::spawn(move || {
                env.load("@main/view.html")
                    .unwrap()
                    .render(&Value::Null)
                    .unwrap()
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(
            handle.join().unwrap(),
            "<body><h1>Title Test</h1><h2>Subtitle Test</h2></body>"
        );
    }
    assert_eq!(env.cached_len(), 1);
}
