// Cardlist detail pages for tests, shaped like the real en.ws-tcg.com markup,
// plus a one-shot loopback HTTP server to serve them from.

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use url::Url;

pub const BASE_URL: &str = "https://en.ws-tcg.com/cardlist/list/";

const PART_IMAGES: &str = "/wordpress/wp-content/images/cardlist/_partimages";

#[derive(Debug, Clone)]
pub struct CardPage {
    pub name: &'static str,
    pub card_no: &'static str,
    pub rarity: &'static str,
    pub card_type: &'static str,
    pub color: &'static str,
    pub level: &'static str,
    pub cost: &'static str,
    pub power: &'static str,
    pub soul_icons: usize,
    pub triggers: &'static [&'static str],
    pub traits: &'static str,
    pub text: &'static str,
    pub image: Option<&'static str>,
    pub prev: Option<&'static str>,
    pub next: Option<&'static str>,
}

impl Default for CardPage {
    fn default() -> Self {
        Self {
            name: "Gudako\nぐだ子",
            card_no: "TSK/S70-E001",
            rarity: "RR",
            card_type: "Character",
            color: "blue",
            level: "2",
            cost: "1",
            power: "9000",
            soul_icons: 2,
            triggers: &["soul", "bag"],
            traits: "Master・Chaldea",
            text: "【AUTO】 When this card attacks, choose 1 of your characters, and that character gets +1000 power until end of turn.",
            image: Some("/wordpress/wp-content/images/cardlist/t/tsk_s70/tsk_s70_e001.png"),
            prev: None,
            next: Some(".?cardno=TSK/S70-E002"),
        }
    }
}

pub fn card_page(page: CardPage) -> String {
    let icon = |stem: &str| format!(r#"<img src="{PART_IMAGES}/{stem}.png" alt="{stem}">"#);

    let graphic = page
        .image
        .map(|src| format!(r#"<td class="graphic" rowspan="8"><img src="{src}" alt=""></td>"#))
        .unwrap_or_default();
    let name = page.name.replace('\n', "<br>\n");
    let soul: String = (0..page.soul_icons).map(|_| icon("soul")).collect();
    let triggers: String = page.triggers.iter().map(|&t| icon(t)).collect();
    let color = icon(page.color);

    let mut neighbor = String::new();
    if let Some(prev) = page.prev {
        neighbor.push_str(&format!(r#"<p class="prev"><a href="{prev}">prev</a></p>"#));
    }
    if let Some(next) = page.next {
        neighbor.push_str(&format!(r#"<p class="next"><a href="{next}">next</a></p>"#));
    }

    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head><title>{card_no} | CARD LIST | Weiss Schwarz</title></head>
<body>
<div id="cardDetail">
<table class="card-detail-table">
<tr>{graphic}<th>Card Name</th><td colspan="3">
{name}
</td></tr>
<tr><th>Card No.</th><td>{card_no}</td><th>Rarity</th><td>{rarity}</td></tr>
<tr><th>Expansion</th><td>Fate/Grand Order</td><th>Side</th><td><img src="{PART_IMAGES}/w.gif"></td></tr>
<tr><th>Card Type</th><td>{card_type}</td><th>Color</th><td>{color}</td></tr>
<tr><th>Level</th><td>{level}</td><th>Cost</th><td>{cost}</td></tr>
<tr><th>Power</th><td>{power}</td><th>Soul</th><td>{soul}</td></tr>
<tr><th>Trigger</th><td>{triggers}</td><th>Attribute</th><td>
  {traits}
</td></tr>
<tr><th>Text</th><td colspan="3">
  {text}
</td></tr>
<tr><th>Flavor Text</th><td colspan="3">-</td></tr>
</table>
<div class="neighbor">{neighbor}</div>
</div>
</body>
</html>"#,
        card_no = page.card_no,
        rarity = page.rarity,
        card_type = page.card_type,
        level = page.level,
        cost = page.cost,
        power = page.power,
        traits = page.traits,
        text = page.text,
    )
}

/// TSK/S70-E001, a blue level 2 character pointing at E002.
pub fn first_card_page() -> String {
    card_page(CardPage::default())
}

/// TSK/S70-E002, the last card: no "next" anchor.
pub fn second_card_page() -> String {
    card_page(CardPage {
        name: "Mash Kyrielight\nマシュ・キリエライト",
        card_no: "TSK/S70-E002",
        rarity: "R",
        card_type: "Event",
        color: "red",
        level: "1",
        cost: "0",
        power: "-",
        soul_icons: 0,
        triggers: &[],
        traits: "-",
        text: "Choose 1 of your characters, and that character gets +2 level until end of turn.",
        image: Some("/wordpress/wp-content/images/cardlist/t/tsk_s70/tsk_s70_e002.png"),
        prev: Some(".?cardno=TSK/S70-E001"),
        next: None,
    })
}

/// A canned HTTP response.
pub struct Canned {
    pub status: &'static str,
    pub content_type: &'static str,
    pub body: Vec<u8>,
}

/// Like the production client, minus any proxy the environment configures.
pub fn loopback_client() -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(std::time::Duration::from_secs(5))
        .user_agent("ws-cardlist-tests")
        .no_proxy()
        .build()
        .unwrap()
}

/// Bind a loopback port and answer exactly one request with `response`.
/// Returns a cardlist-shaped base URL pointing at it.
pub async fn serve_once(response: Canned) -> Url {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut request = Vec::new();
        let mut buf = [0u8; 1024];
        while !request.windows(4).any(|w| w == b"\r\n\r\n") {
            let n = socket.read(&mut buf).await.unwrap();
            if n == 0 {
                break;
            }
            request.extend_from_slice(&buf[..n]);
        }

        let head = format!(
            "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            response.status,
            response.content_type,
            response.body.len()
        );
        socket.write_all(head.as_bytes()).await.unwrap();
        socket.write_all(&response.body).await.unwrap();
        let _ = socket.shutdown().await;
    });

    Url::parse(&format!("http://{addr}/cardlist/list/")).unwrap()
}
