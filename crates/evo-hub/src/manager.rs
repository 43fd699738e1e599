use evo_core::{Instance, WebhookEvent};
use std::fmt::Write;

const STYLE: &str = "\
body { font-family: Arial, sans-serif; margin: 0; padding: 20px; background: #f5f5f5; }
.container { max-width: 800px; margin: 0 auto; background: white; padding: 30px; border-radius: 10px; }
h1 { color: #25D366; text-align: center; }
.status { background: #e8f5e8; padding: 15px; border-left: 4px solid #25D366; }
.card { background: #f9f9f9; padding: 15px; margin: 10px 0; border: 1px solid #ddd; }
.btn { background: #25D366; color: white; padding: 10px 20px; border: none; cursor: pointer; margin: 5px; }
.btn-danger { background: #dc3545; }
";

const SCRIPT: &str = r#"
function createInstance() {
  const name = prompt('Enter instance name:') || 'default';
  fetch('/instance/create', {
    method: 'POST',
    headers: { 'Content-Type': 'application/json' },
    body: JSON.stringify({ instanceName: name })
  }).then(() => location.reload());
}
function connectInstance(id) {
  fetch('/instance/connect/' + encodeURIComponent(id), { method: 'POST' })
    .then(res => res.json())
    .then(data => {
      if (data.qr) {
        const win = window.open('', '_blank');
        win.document.write('<h2>Scan this QR code with WhatsApp:</h2><img src="' + data.qr + '">');
      }
    });
}
function deleteInstance(id) {
  if (confirm('Delete instance ' + id + '?')) {
    fetch('/instance/delete/' + encodeURIComponent(id), { method: 'DELETE' })
      .then(() => location.reload());
  }
}
"#;

/// Server-rendered dashboard. Every caller-supplied string is escaped.
pub fn render(host: &str, instances: &[Instance], webhooks: &[WebhookEvent]) -> String {
    let mut cards = String::new();
    for instance in instances {
        let id = escape_html(&instance.id);
        let id_js = escape_html(&js_string(&instance.id));
        let phone = instance
            .phone
            .as_deref()
            .map(escape_html)
            .unwrap_or_else(|| "Not connected".to_string());
        let _ = write!(
            cards,
            "<div class=\"card\"><strong>Instance:</strong> {id}<br>\
             <strong>Status:</strong> {status}<br>\
             <strong>Phone:</strong> {phone}<br>\
             <button class=\"btn\" onclick=\"connectInstance({id_js})\">Connect</button>\
             <button class=\"btn btn-danger\" onclick=\"deleteInstance({id_js})\">Delete</button></div>",
            status = instance.status,
        );
    }

    let mut events = String::new();
    for event in webhooks {
        let _ = write!(
            events,
            "<li>{at} <strong>{instance}</strong> {payload}</li>",
            at = event.received_at.to_rfc3339(),
            instance = escape_html(&event.instance_id),
            payload = escape_html(&event.payload.to_string()),
        );
    }
    if events.is_empty() {
        events.push_str("<li>No webhooks received yet</li>");
    }

    format!(
        "<!DOCTYPE html><html><head><title>Evolution API Manager</title>\
         <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">\
         <style>{STYLE}</style></head><body><div class=\"container\">\
         <h1>Evolution API Manager</h1>\
         <div class=\"status\"><strong>Status:</strong> Evolution API is running<br>\
         <strong>Server:</strong> {host}<br>\
         <strong>Instances:</strong> {count} active</div>\
         <h3>Instances</h3>\
         <button class=\"btn\" onclick=\"createInstance()\">+ Create New Instance</button>\
         <div id=\"instance-list\">{cards}</div>\
         <h3>Recent webhooks</h3><ul>{events}</ul>\
         </div><script>{SCRIPT}</script></body></html>",
        host = escape_html(host),
        count = instances.len(),
    )
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    out
}

fn js_string(input: &str) -> String {
    serde_json::Value::String(input.to_string()).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use evo_core::{InstanceStatus, SYNTHETIC_PHONE};

    #[test]
    fn escapes_instance_ids() {
        let instance = Instance::new("<script>alert('x')</script>");
        let html = render("localhost", &[instance], &[]);
        assert!(!html.contains("<script>alert"));
        assert!(html.contains("&lt;script&gt;"));
    }

    #[test]
    fn shows_phone_once_connected() {
        let mut connected = Instance::new("gym");
        connected.status = InstanceStatus::Connected;
        connected.phone = Some(SYNTHETIC_PHONE.to_string());
        let pending = Instance::new("yoga");

        let html = render("localhost:3000", &[connected, pending], &[]);
        assert!(html.contains(SYNTHETIC_PHONE));
        assert!(html.contains("Not connected"));
        assert!(html.contains("2 active"));
        assert!(html.contains("No webhooks received yet"));
    }
}
