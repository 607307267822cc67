//! Markup builders shaped like the real sites, for tests.

fn esc(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn cnn_search_page(total: Option<usize>, links: &[&str]) -> String {
    let counter = total
        .map(|t| {
            format!(
                r#"<div class="search__results-count">Displaying results 1-10 out of {t} for</div>"#
            )
        })
        .unwrap_or_default();
    let items: String = links
        .iter()
        .map(|href| {
            format!(
                r#"<div class="container__headline container_list-images-with-description__headline"><span class="container__headline-text" data-zjs-href="{href}">Headline</span></div>"#
            )
        })
        .collect();
    format!("<html><body>{counter}<div class=\"results\">{items}</div></body></html>")
}

pub fn cnn_article(headline: &str, timestamp: &str, paragraphs: &[&str]) -> String {
    cnn_article_with_subheaders(headline, timestamp, paragraphs, &[])
}

/// Subheaders are interleaved after the first paragraph, as CNN places them.
pub fn cnn_article_with_subheaders(
    headline: &str,
    timestamp: &str,
    paragraphs: &[&str],
    subheaders: &[&str],
) -> String {
    let mut parts: Vec<String> = paragraphs
        .iter()
        .map(|p| format!(r#"<p class="paragraph inline-placeholder">{}</p>"#, esc(p)))
        .collect();
    let at = parts.len().min(1);
    for (i, h) in subheaders.iter().enumerate() {
        parts.insert(at + i, format!(r#"<h2 class="subheader">{}</h2>"#, esc(h)));
    }
    let body = parts.concat();
    format!(
        r#"<html><body>
<div class="headline headline--has-lowertext">
  <div class="headline__wrapper"><h1 id="maincontent">{}</h1></div>
  <div class="headline__sub-text"><div class="timestamp">{}</div></div>
</div>
<div class="article__content">{body}<p class="editor-note">Not a body paragraph</p></div>
</body></html>"#,
        esc(headline),
        esc(timestamp)
    )
}

/// `entries` are `(headline, timestamp, body)`.
pub fn cnn_live_blog(entries: &[(&str, &str, &str)], fallback_container: bool) -> String {
    let articles: String = entries
        .iter()
        .map(|(headline, date, body)| {
            format!(
                "<article><header><h2>{}</h2><span>{}</span></header><div><p>{}</p></div></article>",
                esc(headline),
                esc(date),
                esc(body)
            )
        })
        .collect();
    let open = if fallback_container {
        r#"<div id="posts-and-button">"#
    } else {
        r#"<div class="live-story__items-container">"#
    };
    format!("<html><body>{open}{articles}</div></body></html>")
}

pub fn fox_search_stage(links: &[&str]) -> String {
    let items: String = links
        .iter()
        .map(|href| format!(r#"<article><div class="m"><a href="{href}"><img/></a></div></article>"#))
        .collect();
    format!(
        r#"<html><body><div class="collection-search">{items}</div><div class="button load-more"><a>Load More</a></div></body></html>"#
    )
}

pub fn fox_article(headline: &str, date: &str, paragraphs: &[&str]) -> String {
    let body: String = paragraphs
        .iter()
        .map(|p| format!("<p>{}</p>", esc(p)))
        .collect();
    format!(
        r#"<html><body>
<header class="article-header">
  <h1 class="headline">{}</h1>
  <div class="article-meta"><span class="article-date">{}</span></div>
</header>
<div class="article-body">{body}</div>
</body></html>"#,
        esc(headline),
        esc(date)
    )
}
