use atom_syndication::Feed;
use chrono::{Duration, TimeZone, Utc};
use tempfile::TempDir;
use threadpress::build::{Error, Generator, Stage, StageError};
use threadpress::config::{Comments, Config, SiteConfig};
use threadpress::record::{Category, Record};
use url::Url;

type TestResult = Result<(), Box<dyn std::error::Error>>;

struct Project {
    root: TempDir,
}

impl Project {
    fn new() -> Result<Project, Box<dyn std::error::Error>> {
        let root = TempDir::new()?;
        let templates = root.path().join("templates");
        std::fs::create_dir_all(&templates)?;
        std::fs::write(
            templates.join("_head.html"),
            r#"{{define "head"}}<title>{{.site.title}}</title>{{end}}"#,
        )?;
        std::fs::write(
            templates.join("index.html"),
            concat!(
                r#"{{template "head" .}}"#,
                r#"{{range .records}}<article data-number="{{.number}}">{{.title}}</article>{{end}}"#,
                r#"{{if .pagination.has_prev}}<a rel="prev" href="{{.pagination.prev_link}}"></a>{{end}}"#,
                r#"{{if .pagination.has_next}}<a rel="next" href="{{.pagination.next_link}}"></a>{{end}}"#,
            ),
        )?;
        std::fs::write(
            templates.join("post.html"),
            r#"{{template "head" .}}<h1>{{.record.title}}</h1>{{markdown .record.body}}"#,
        )?;
        std::fs::write(
            templates.join("tags.html"),
            r#"{{range .tags}}<a href="{{.path}}">{{trimBraces .name}} ({{.count}})</a>{{end}}"#,
        )?;
        std::fs::write(
            templates.join("tag.html"),
            r#"<h1>{{trimBraces .tag}}</h1>{{range .records}}<article data-number="{{.number}}"></article>{{end}}"#,
        )?;

        let public = root.path().join("public");
        std::fs::create_dir_all(public.join("css"))?;
        std::fs::write(public.join("css/site.css"), "body { margin: 0; }")?;
        std::fs::write(public.join("favicon.ico"), "icon")?;
        Ok(Project { root })
    }

    fn config(&self, about_id: i64) -> Result<Config, url::ParseError> {
        let site = SiteConfig {
            title: String::from("Discussions"),
            url: Url::parse("https://example.org/blog/")?,
            description: String::from("Threads, rendered"),
            author: String::from("octocat"),
            email: String::from("octocat@example.org"),
            about_id,
            language: String::from("en-US"),
            favicon: String::from("/favicon.ico"),
            comments: Comments::default(),
        };
        Ok(Config::new(
            site,
            self.root.path().join("_site"),
            self.root.path().join("templates"),
            self.root.path().join("public"),
        ))
    }

    fn out(&self) -> std::path::PathBuf {
        self.root.path().join("_site")
    }

    fn read(&self, path: &str) -> std::io::Result<String> {
        std::fs::read_to_string(self.out().join(path))
    }
}

/// Builds `n` records; record `i` is `i` days old, so lower numbers are newer.
fn records(n: u32) -> Vec<Record> {
    let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();
    (1..=n)
        .map(|i| Record {
            id: format!("D_{}", i),
            number: i,
            title: format!("Thread {}", i),
            body: format!("Body **{}**", i),
            author: String::from("octocat"),
            category: Category {
                id: String::from("C_1"),
                name: String::from("Ideas"),
            },
            labels: match i % 2 {
                0 => vec![String::from("even"), String::from("{all}")],
                _ => vec![String::from("{all}")],
            },
            created_at: now - Duration::days(i64::from(i)),
            url: format!("https://github.com/o/r/discussions/{}", i),
        })
        .collect()
}

fn numbers_in(html: &str) -> Vec<u32> {
    html.split(r#"data-number=""#)
        .skip(1)
        .filter_map(|rest| rest.split('"').next())
        .filter_map(|n| n.parse().ok())
        .collect()
}

#[test]
fn test_three_records_newest_first() -> TestResult {
    let project = Project::new()?;
    let generator = Generator::new(project.config(0)?)?;
    let mut input = records(3);
    input.reverse();
    generator.generate(input)?;

    let index = project.read("index.html")?;
    assert!(index.contains("<title>Discussions</title>"));
    assert_eq!(vec![1, 2, 3], numbers_in(&index));
    assert!(!index.contains(r#"rel="next""#));
    assert!(!project.out().join("page").exists());
    for n in 1..=3 {
        assert!(project.out().join(format!("post/{}/index.html", n)).is_file());
    }
    assert!(!project.out().join("about").exists());
    Ok(())
}

#[test]
fn test_twenty_five_records_paginate() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(0)?)?.generate(records(25))?;

    let pages = [
        project.read("index.html")?,
        project.read("page/2/index.html")?,
        project.read("page/3/index.html")?,
    ];
    let counts: Vec<usize> = pages.iter().map(|p| numbers_in(p).len()).collect();
    assert_eq!(vec![10, 10, 5], counts);
    assert!(!project.out().join("page/4").exists());

    assert!(pages[1].contains(r#"<a rel="prev" href="/">"#));
    assert!(pages[1].contains(r#"<a rel="next" href="/page/3/">"#));
    assert_eq!((11..=20).collect::<Vec<u32>>(), numbers_in(&pages[1]));
    Ok(())
}

#[test]
fn test_about_record() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(2)?)?.generate(records(3))?;

    let about = project.read("about/index.html")?;
    assert!(about.contains("<h1>Thread 2</h1>"));
    assert!(about.contains("<strong>2</strong>"));
    assert_eq!(vec![1, 3], numbers_in(&project.read("index.html")?));
    // The about record still gets its own post page.
    assert!(project.out().join("post/2/index.html").is_file());
    Ok(())
}

#[test]
fn test_about_disabled_or_missing() -> TestResult {
    for about_id in [0, -1, 99] {
        let project = Project::new()?;
        Generator::new(project.config(about_id)?)?.generate(records(3))?;
        assert!(!project.out().join("about").exists());
        assert_eq!(vec![1, 2, 3], numbers_in(&project.read("index.html")?));
    }
    Ok(())
}

#[test]
fn test_tag_pages() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(0)?)?.generate(records(5))?;

    let tags = project.read("tags/index.html")?;
    assert_eq!(
        r#"<a href="/tags/even/">even (2)</a><a href="/tags/%7Ball%7D/">all (5)</a>"#,
        tags
    );
    let even = project.read("tags/even/index.html")?;
    assert!(even.starts_with("<h1>even</h1>"));
    assert_eq!(vec![2, 4], numbers_in(&even));
    assert_eq!(vec![1, 2, 3, 4, 5], numbers_in(&project.read("tags/{all}/index.html")?));
    Ok(())
}

#[test]
fn test_feed_is_capped() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(1)?)?.generate(records(15))?;

    let feed = Feed::read_from(std::io::BufReader::new(std::fs::File::open(
        project.out().join("atom.xml"),
    )?))?;
    assert_eq!(10, feed.entries.len());
    let ids: Vec<String> = feed.entries.iter().map(|e| e.id.clone()).collect();
    let expected: Vec<String> = (1..=10)
        .map(|i| format!("https://example.org/blog/post/{}/", i))
        .collect();
    assert_eq!(expected, ids);
    assert_eq!(
        Utc.with_ymd_and_hms(2024, 5, 31, 12, 0, 0).unwrap(),
        feed.updated.with_timezone(&Utc)
    );
    assert_eq!(Some("en-US"), feed.lang.as_deref());
    Ok(())
}

#[test]
fn test_search_index() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(0)?)?.generate(records(2))?;

    let index: serde_json::Value = serde_json::from_str(&project.read("search-index.json")?)?;
    assert_eq!(
        serde_json::json!([
            {
                "id": 1,
                "title": "Thread 1",
                "content": "Body 1",
                "category": "Ideas",
                "labels": ["{all}"],
                "date": "2024-05-31",
            },
            {
                "id": 2,
                "title": "Thread 2",
                "content": "Body 2",
                "category": "Ideas",
                "labels": ["even", "{all}"],
                "date": "2024-05-30",
            },
        ]),
        index
    );
    Ok(())
}

#[test]
fn test_stylesheet_and_assets() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(0)?)?.generate(records(1))?;

    let css = project.read("styles/highlight.css")?;
    assert!(css.contains(".hl-code"));
    assert!(css.contains(r#"[data-theme="dark"] .hl-code"#));
    assert_eq!("body { margin: 0; }", project.read("css/site.css")?);
    assert_eq!("icon", project.read("favicon.ico")?);
    Ok(())
}

#[test]
fn test_zero_records() -> TestResult {
    let project = Project::new()?;
    Generator::new(project.config(0)?)?.generate(Vec::new())?;

    assert!(!project.out().join("index.html").exists());
    assert_eq!("", project.read("tags/index.html")?);
    assert_eq!("[]", project.read("search-index.json")?);
    assert!(Feed::read_from(project.read("atom.xml")?.as_bytes())?
        .entries
        .is_empty());
    Ok(())
}

#[test]
fn test_rerun_overwrites() -> TestResult {
    let project = Project::new()?;
    let generator = Generator::new(project.config(0)?)?;
    generator.generate(records(3))?;
    let mut changed = records(3);
    changed[0].title = String::from("Renamed");
    generator.generate(changed)?;
    assert!(project.read("index.html")?.contains("Renamed"));
    Ok(())
}

#[test]
fn test_broken_template_writes_nothing() -> TestResult {
    let project = Project::new()?;
    std::fs::write(
        project.root.path().join("templates/tag.html"),
        "{{if .tag}}never closed",
    )?;
    match Generator::new(project.config(0)?) {
        Err(Error::Templates(_)) => {}
        Err(err) => panic!("unexpected error: {}", err),
        Ok(_) => panic!("expected a template error"),
    }
    assert!(!project.out().exists());
    Ok(())
}

#[test]
fn test_missing_static_dir_fails_assets_stage() -> TestResult {
    let project = Project::new()?;
    std::fs::remove_dir_all(project.root.path().join("public"))?;
    let err = match Generator::new(project.config(0)?)?.generate(records(2)) {
        Err(err) => err,
        Ok(()) => panic!("expected the assets stage to fail"),
    };
    match &err {
        Error::Stage {
            stage: Stage::Assets,
            source: StageError::StaticDirNotFound(_),
        } => {}
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().starts_with("assets: "));
    // Earlier stages' output stays.
    assert!(project.out().join("search-index.json").is_file());
    Ok(())
}
