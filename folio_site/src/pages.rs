use folio_engine::PLACEHOLDER;
use folio_engine::content::{Block, BlogCatalog, BlogPost, Experience, Portfolio, RecentUpdate};
use folio_engine::core_modules::readiness::ModelState;
use folio_engine::core_modules::sentiment::{EXAMPLE_TEXTS, SentimentResult};
use folio_engine::PipelineConfig;
use leptos::*;

const NAME: &str = "Max Kendall";
const SOCIAL: [(&str, &str); 3] = [
    ("Email", "mailto:max@maxkendall.com"),
    ("LinkedIn", "https://www.linkedin.com/in/max-kendall/"),
    ("GitHub", "https://github.com/madmax755"),
];
const NAV: [(&str, &str); 5] = [
    ("Home", "/"),
    ("Portfolio", "/portfolio"),
    ("Blog", "/blog"),
    ("CNN Demo", "/cnn_demo"),
    ("Sentiment", "/sentiment_demo"),
];

fn render<F, N>(view: F) -> String
where
    F: FnOnce() -> N + 'static,
    N: IntoView,
{
    format!("<!DOCTYPE html>{}", leptos::ssr::render_to_string(view))
}

#[component]
fn Navigation(active: &'static str) -> impl IntoView {
    view! {
        <nav class="nav">
            <a class="brand" href="/">{NAME}</a>
            <ul>
                {NAV
                    .iter()
                    .map(|(label, href)| {
                        let class = if *href == active { "active" } else { "" };
                        view! { <li><a href=*href class=class>{*label}</a></li> }
                    })
                    .collect_view()}
            </ul>
        </nav>
    }
}

#[component]
fn Footer() -> impl IntoView {
    view! {
        <footer class="footer">
            <h3>{NAME}</h3>
            <ul>
                {SOCIAL.iter().map(|(label, href)| view! { <li><a href=*href>{*label}</a></li> }).collect_view()}
            </ul>
            <p>"Built with Rust, axum & leptos"</p>
        </footer>
    }
}

#[component]
fn Layout(
    #[prop(into)] title: String,
    /// Route whose navigation link is highlighted.
    #[prop(optional)]
    active: &'static str,
    children: Children,
) -> impl IntoView {
    view! {
        <html lang="en">
            <head>
                <meta charset="utf-8"/>
                <meta name="viewport" content="width=device-width, initial-scale=1"/>
                <title>{format!("{title} | {NAME}")}</title>
                <link rel="stylesheet" href="/style.css"/>
            </head>
            <body>
                <Navigation active=active/>
                <main>{children()}</main>
                <Footer/>
                <script src="/client.js"></script>
            </body>
        </html>
    }
}

pub fn home() -> String {
    render(|| {
        view! {
            <Layout title="Home" active="/">
                <section class="hero">
                    <h1>{NAME}</h1>
                    <p class="tagline">"Software engineer. Neural networks from scratch, streaming systems, self-hosting."</p>
                    <div class="demos">
                        <a class="card" href="/cnn_demo">
                            <h2>"CNN Demo"</h2>
                            <p>"Handwritten digit recognition"</p>
                        </a>
                        <a class="card" href="/sentiment_demo">
                            <h2>"Sentiment Analysis"</h2>
                            <p>"Real-time text sentiment"</p>
                        </a>
                    </div>
                </section>
            </Layout>
        }
    })
}

fn experience_view(entry: Experience) -> impl IntoView {
    view! {
        <article class="timeline-entry">
            <span class="period">{entry.period}</span>
            <h2>
                {match entry.link {
                    Some(href) => view! { <a href=href>{entry.title}</a> }.into_view(),
                    None => entry.title.into_view(),
                }}
            </h2>
            <p>{entry.description}</p>
            <ul>
                {entry.achievements.into_iter().map(|a| view! { <li>{a}</li> }).collect_view()}
            </ul>
            {entry.results.map(|r| view! { <p class="results">{r}</p> })}
        </article>
    }
}

pub fn portfolio(portfolio: &Portfolio) -> String {
    let entries = portfolio.experiences.clone();
    render(move || {
        view! {
            <Layout title="Portfolio" active="/portfolio">
                <h1>"Portfolio"</h1>
                <section class="timeline">
                    {entries.into_iter().map(experience_view).collect_view()}
                </section>
            </Layout>
        }
    })
}

fn update_view(update: RecentUpdate) -> impl IntoView {
    let class = if update.external { "external" } else { "internal" };
    view! {
        <li>
            <span class="kind">{update.kind}</span>
            <a href=update.link class=class>{update.title}</a>
        </li>
    }
}

fn post_card(post: BlogPost) -> impl IntoView {
    let href = format!("/blog/{}", post.slug);
    let meta = post.frontmatter;
    view! {
        <article class="post-card">
            <span class="date">{meta.date}</span>
            <h2><a href=href>{meta.title}</a></h2>
            <p>{meta.description}</p>
            <ul class="tags">
                {meta.tags.into_iter().map(|t| view! { <li>{t}</li> }).collect_view()}
            </ul>
        </article>
    }
}

pub fn blog(catalog: &BlogCatalog, portfolio: &Portfolio) -> String {
    let posts = catalog.posts().to_vec();
    let updates = portfolio.recent_updates.clone();
    render(move || {
        let empty = posts.is_empty();
        view! {
            <Layout title="Blog" active="/blog">
                <h1>"Blog & Articles"</h1>
                <div class="blog">
                    <section class="posts">
                        {empty.then(|| view! { <p>"No posts yet."</p> })}
                        {posts.into_iter().map(post_card).collect_view()}
                    </section>
                    <aside class="updates">
                        <h2>"Recent Updates"</h2>
                        <ul>{updates.into_iter().map(update_view).collect_view()}</ul>
                    </aside>
                </div>
            </Layout>
        }
    })
}

fn block_view(block: Block) -> View {
    match block {
        Block::Heading { level: 1, text } => view! { <h2>{text}</h2> }.into_view(),
        Block::Heading { level: 2, text } => view! { <h3>{text}</h3> }.into_view(),
        Block::Heading { text, .. } => view! { <h4>{text}</h4> }.into_view(),
        Block::Paragraph(text) => view! { <p>{text}</p> }.into_view(),
        Block::List(items) => view! {
            <ul>{items.into_iter().map(|i| view! { <li>{i}</li> }).collect_view()}</ul>
        }
        .into_view(),
        Block::Code { lang, filename, code } => {
            let class = lang.map(|l| format!("language-{l}")).unwrap_or_default();
            view! {
                <div class="code-block">
                    {filename.map(|f| view! { <div class="code-filename">{f}</div> })}
                    <pre><code class=class>{code}</code></pre>
                </div>
            }
            .into_view()
        }
    }
}

pub fn blog_post(post: &BlogPost) -> String {
    let post = post.clone();
    render(move || {
        let meta = post.frontmatter;
        let title = meta.title.clone();
        view! {
            <Layout title=title active="/blog">
                <a class="back" href="/blog">"Back to Blog"</a>
                <header class="post-header">
                    <span class="date">{meta.date}</span>
                    <ul class="tags">
                        {meta.tags.into_iter().map(|t| view! { <li>{t}</li> }).collect_view()}
                    </ul>
                    <h1>{meta.title}</h1>
                    <p class="description">{meta.description}</p>
                </header>
                <article class="post-body">
                    {post.body.into_iter().map(block_view).collect_view()}
                </article>
            </Layout>
        }
    })
}

pub fn cnn_demo(config: &PipelineConfig, state: &ModelState) -> String {
    let width = config.surface_width.to_string();
    let height = config.surface_height.to_string();
    let cell = config.cell_size.to_string();
    let (phase, status) = match state {
        ModelState::Loading => ("loading", "Loading model...".to_string()),
        ModelState::Ready => ("ready", String::new()),
        ModelState::Failed(reason) => ("failed", format!("Model failed to load: {reason}")),
    };
    render(move || {
        // The surface only exists once the model can answer.
        let surface = if phase == "ready" {
            view! {
                <div class="surface">
                    <canvas id="surface" width=width height=height data-cell=cell></canvas>
                    <button id="clear-surface">"Clear"</button>
                </div>
            }
            .into_view()
        } else {
            view! {
                <div id="model-loading" class=format!("model-loading {phase}") data-state=phase>
                    {(phase == "loading").then(|| view! { <div class="spinner"></div> })}
                    <p>{status}</p>
                </div>
            }
            .into_view()
        };
        view! {
            <Layout title="CNN Demo" active="/cnn_demo">
                <h1>"Handwritten Digit Recognition"</h1>
                <p>"Draw a digit from 0 to 9. The network predicts as you draw."</p>
                <div class="cnn-demo" id="cnn-demo">
                    {surface}
                    <div id="predictions" class="predictions">
                        <p class="placeholder">{PLACEHOLDER}</p>
                    </div>
                </div>
            </Layout>
        }
    })
}

pub fn sentiment_demo() -> String {
    let neutral = SentimentResult::neutral().colour.to_string();
    render(move || {
        view! {
            <Layout title="Sentiment Analysis" active="/sentiment_demo">
                <h1>"Sentiment Analysis"</h1>
                <div class="sentiment-demo" id="sentiment-demo">
                    <div class="input">
                        <div id="sentiment-frame" class="text-frame" style=format!("background-color: {neutral}")>
                            <textarea id="sentiment-text" rows="8" placeholder="Enter your text here..."></textarea>
                        </div>
                        <button id="clear-text">"Clear Text"</button>
                    </div>
                    <div class="analysis">
                        <h2>"Analysis"</h2>
                        <div id="sentiment-result" class="result">
                            <p class="placeholder">"No result"</p>
                        </div>
                    </div>
                </div>
                <div class="examples">
                    <h2>"Try an example"</h2>
                    {EXAMPLE_TEXTS
                        .iter()
                        .map(|(text, label)| {
                            view! { <button class="example" data-text=*text title=*text>{label.as_str()}</button> }
                        })
                        .collect_view()}
                </div>
            </Layout>
        }
    })
}

pub fn not_found() -> String {
    render(|| {
        view! {
            <Layout title="Not Found">
                <h1>"Page not found"</h1>
                <a href="/">"Back home"</a>
            </Layout>
        }
    })
}
