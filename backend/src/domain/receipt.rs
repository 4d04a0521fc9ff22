//! Order receipt composition.
//!
//! Receipts are rendered as HTML and plain text. Amounts use Indian digit
//! grouping (`₹1,10,000.00`) and every user-supplied string is escaped before
//! it reaches the HTML body.

use std::fmt::Write as _;

use super::Order;

/// Rendered receipt ready for a mailer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptContent {
    /// Subject line.
    pub subject: String,
    /// HTML body.
    pub html: String,
    /// Plain-text body.
    pub text: String,
}

/// Outbound message handed to a [`ReceiptMailer`](super::ports::ReceiptMailer).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiptMessage {
    /// Recipient address.
    pub to: String,
    /// Rendered content.
    pub content: ReceiptContent,
}

const FALLBACK_TITLE: &str = "Item";

/// Format minor units as Indian rupees.
///
/// # Examples
/// ```
/// use fluxcart::domain::receipt::format_inr;
///
/// assert_eq!(format_inr(11_000_000), "₹1,10,000.00");
/// assert_eq!(format_inr(99_950), "₹999.50");
/// assert_eq!(format_inr(-1_500), "-₹15.00");
/// ```
#[must_use]
pub fn format_inr(cents: i64) -> String {
    let sign = if cents < 0 { "-" } else { "" };
    let magnitude = cents.unsigned_abs();
    let rupees = magnitude.checked_div(100).unwrap_or(0);
    let paise = magnitude.checked_rem(100).unwrap_or(0);
    format!("{sign}₹{}.{paise:02}", group_indian(rupees))
}

fn group_indian(value: u64) -> String {
    let digits = value.to_string();
    if digits.len() <= 3 {
        return digits;
    }
    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups: Vec<&str> = Vec::new();
    let mut rest = head;
    while rest.len() > 2 {
        let (front, back) = rest.split_at(rest.len() - 2);
        groups.push(back);
        rest = front;
    }
    groups.push(rest);
    groups.reverse();
    format!("{},{tail}", groups.join(","))
}

/// Escape the characters that matter inside HTML text and attributes.
#[must_use]
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Storefront link to an order.
#[must_use]
pub fn order_url(web_url: &str, order: &Order) -> String {
    format!("{}/orders/{}", web_url.trim_end_matches('/'), order.id)
}

fn item_title(order: &Order, index: usize) -> &str {
    order
        .items
        .get(index)
        .and_then(|item| item.product.as_ref())
        .map_or(FALLBACK_TITLE, |product| product.title.as_str())
}

/// Render the confirmation receipt for an order.
#[must_use]
pub fn compose_receipt(order: &Order, recipient_name: Option<&str>, web_url: &str) -> ReceiptContent {
    ReceiptContent {
        subject: format!("Your FluxCart order {} is confirmed", order.id),
        html: render_html(order, recipient_name, web_url),
        text: render_text(order, web_url),
    }
}

fn render_html(order: &Order, recipient_name: Option<&str>, web_url: &str) -> String {
    let url = escape_html(&order_url(web_url, order));
    let greeting = recipient_name
        .map(str::trim)
        .filter(|name| !name.is_empty())
        .map(|name| format!(", {}", escape_html(name)))
        .unwrap_or_default();

    let mut rows = String::new();
    for (index, item) in order.items.iter().enumerate() {
        let _ = write!(
            rows,
            "<tr><td style=\"padding:8px 12px;\">{}</td>\
             <td style=\"padding:8px 12px;text-align:center;\">{}</td>\
             <td style=\"padding:8px 12px;text-align:right;\">{}</td></tr>",
            escape_html(item_title(order, index)),
            item.qty,
            format_inr(item.price_cents),
        );
    }

    let discount_row = if order.discount_cents > 0 {
        format!(
            "<tr><td colspan=\"2\" align=\"right\" style=\"padding:8px 12px;\">Discount</td>\
             <td align=\"right\" style=\"padding:8px 12px;\">-{}</td></tr>",
            format_inr(order.discount_cents)
        )
    } else {
        String::new()
    };

    format!(
        "<div style=\"font-family:system-ui,sans-serif;max-width:640px;margin:auto;color:#111;\">\
         <h2 style=\"margin:16px 0;\">Thanks{greeting}, your order is confirmed!</h2>\
         <p style=\"margin:0 0 12px;\">Order ID: <b>{id}</b></p>\
         <table width=\"100%\" cellspacing=\"0\" cellpadding=\"0\" style=\"border-collapse:collapse;border:1px solid #eee;\">\
         <thead><tr style=\"background:#fafafa\">\
         <th align=\"left\" style=\"padding:10px 12px;\">Item</th>\
         <th align=\"center\" style=\"padding:10px 12px;\">Qty</th>\
         <th align=\"right\" style=\"padding:10px 12px;\">Price</th></tr></thead>\
         <tbody>{rows}</tbody>\
         <tfoot>\
         <tr><td colspan=\"2\" align=\"right\" style=\"padding:8px 12px;\">Subtotal</td>\
         <td align=\"right\" style=\"padding:8px 12px;\">{subtotal}</td></tr>\
         {discount_row}\
         <tr><td colspan=\"2\" align=\"right\" style=\"padding:8px 12px;\"><b>Total</b></td>\
         <td align=\"right\" style=\"padding:8px 12px;\"><b>{total}</b></td></tr>\
         </tfoot></table>\
         <div style=\"text-align:center;margin:24px 0 8px;\">\
         <a href=\"{url}\" style=\"display:inline-block;padding:12px 20px;border-radius:999px;background:#111;color:#fff;text-decoration:none;font-weight:600;\">View Order</a>\
         </div>\
         <p style=\"font-size:13px;color:#555;\">If the button doesn't work, open this link: {url}</p>\
         </div>",
        id = order.id,
        subtotal = format_inr(order.subtotal_cents()),
        total = format_inr(order.total_cents),
    )
}

fn render_text(order: &Order, web_url: &str) -> String {
    let mut lines = vec![
        "Your order is confirmed!".to_owned(),
        format!("Order ID: {}", order.id),
        String::new(),
        "Items:".to_owned(),
    ];
    for (index, item) in order.items.iter().enumerate() {
        lines.push(format!(
            "- {}  x{}  {}",
            item_title(order, index),
            item.qty,
            format_inr(item.price_cents)
        ));
    }
    lines.push(String::new());
    lines.push(format!("Subtotal: {}", format_inr(order.subtotal_cents())));
    if order.discount_cents > 0 {
        lines.push(format!("Discount: -{}", format_inr(order.discount_cents)));
    }
    lines.push(format!("Total: {}", format_inr(order.total_cents)));
    lines.push(String::new());
    lines.push(format!("View your order: {}", order_url(web_url, order)));
    lines.join("\n")
}
