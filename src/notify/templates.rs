//! Message templates, one per notification type, rendered as Telegram HTML.

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::models::notification::NotificationKind;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Channel,
    Recipient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingMessage {
    pub destination: Destination,
    pub text: String,
}

impl OutgoingMessage {
    fn new(destination: Destination, text: String) -> Self {
        Self { destination, text }
    }
}

const MISSING: &str = "—";

pub fn render(
    kind: NotificationKind,
    has_recipient: bool,
    data: &Value,
    at: DateTime<Utc>,
) -> Vec<OutgoingMessage> {
    let time = at.format("%d.%m.%Y %H:%M").to_string();
    let direct_or_channel = if has_recipient {
        Destination::Recipient
    } else {
        Destination::Channel
    };

    match kind {
        NotificationKind::DriverRegistered => vec![OutgoingMessage::new(
            Destination::Channel,
            format!(
                "🚛 <b>Новый водитель зарегистрирован</b>\n\n👤 Имя: {}\n🚗 Госномер: {}\n🕐 Время: {time}",
                field(data, "driverName"),
                field(data, "vehiclePlate"),
            ),
        )],
        NotificationKind::OrderCreated => vec![OutgoingMessage::new(
            Destination::Channel,
            format!(
                "📦 <b>Новая заявка</b>\n\n📍 Откуда: {}\n🏁 Куда: {}\n📝 Описание: {}\n🕐 Время: {time}",
                field(data, "from"),
                field(data, "to"),
                field(data, "description"),
            ),
        )],
        NotificationKind::OrderCompleted => {
            let route = format!("{} → {}", field(data, "from"), field(data, "to"));
            vec![
                OutgoingMessage::new(
                    Destination::Recipient,
                    format!(
                        "✅ <b>Ваш груз доставлен!</b>\n\n🛣 Маршрут: {route}\n🕐 Время доставки: {time}\n\n⭐ Пожалуйста, оцените работу водителя от 1 до 5."
                    ),
                ),
                OutgoingMessage::new(
                    Destination::Channel,
                    format!(
                        "✅ <b>Заказ выполнен</b>\n\n🛣 Маршрут: {route}\n👤 Водитель: {}\n🕐 Время: {time}",
                        field(data, "driverName"),
                    ),
                ),
            ]
        }
        NotificationKind::DriverRating => {
            let comment = optional_line(data, "comment", "💬 Комментарий");
            vec![OutgoingMessage::new(
                Destination::Recipient,
                format!(
                    "⭐ <b>Новая оценка</b>\n\nОценка: {}/5\n{comment}🛣 Маршрут: {}",
                    field(data, "rating"),
                    field(data, "route"),
                ),
            )]
        }
        NotificationKind::SystemAlert => vec![OutgoingMessage::new(
            Destination::Channel,
            format!(
                "⚠️ <b>Системное уведомление</b>\n\n{}",
                field(data, "message")
            ),
        )],
        NotificationKind::LocationUpdate => vec![OutgoingMessage::new(
            direct_or_channel,
            format!(
                "📍 <b>Обновление местоположения</b>\n\n📦 Трек-номер: {}\n📌 Местоположение: {}\n📊 Статус: {}\n🕐 Время: {time}",
                field(data, "trackingNumber"),
                field(data, "location"),
                status_label(data, "status"),
            ),
        )],
        NotificationKind::StatusChange => vec![OutgoingMessage::new(
            direct_or_channel,
            format!(
                "🔄 <b>Статус заказа изменён</b>\n\n📦 Трек-номер: {}\n📊 {} → {}\n🕐 Время: {time}",
                field(data, "trackingNumber"),
                status_label(data, "oldStatus"),
                status_label(data, "status"),
            ),
        )],
        NotificationKind::NewOrder => vec![OutgoingMessage::new(
            Destination::Channel,
            format!(
                "🆕 <b>Заказ ожидает водителя</b>\n\n🛣 Маршрут: {} → {}\n⚖️ Вес: {} кг\n📦 Объём: {} м³\n🚚 Тип кузова: {}\n💰 Цена: {}\n🕐 Время: {time}",
                field(data, "from"),
                field(data, "to"),
                field(data, "weightKg"),
                field(data, "volumeM3"),
                field(data, "carType"),
                field(data, "price"),
            ),
        )],
        NotificationKind::DriverAssigned => {
            let route = format!("{} → {}", field(data, "from"), field(data, "to"));
            let tracking = field(data, "trackingNumber");
            vec![
                OutgoingMessage::new(
                    Destination::Recipient,
                    format!(
                        "🚚 <b>Вам назначен заказ</b>\n\n📦 Трек-номер: {tracking}\n🛣 Маршрут: {route}\n🕐 Время: {time}"
                    ),
                ),
                OutgoingMessage::new(
                    Destination::Channel,
                    format!(
                        "🤝 <b>Водитель назначен</b>\n\n📦 Трек-номер: {tracking}\n🛣 Маршрут: {route}\n👤 Водитель: {}\n🕐 Время: {time}",
                        field(data, "driverName"),
                    ),
                ),
            ]
        }
    }
}

/// Reads a template value as display text, HTML-escaped.
fn field(data: &Value, key: &str) -> String {
    match data.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => escape_html(s.trim()),
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Bool(b)) => b.to_string(),
        _ => MISSING.to_string(),
    }
}

fn optional_line(data: &Value, key: &str, label: &str) -> String {
    match data.get(key).and_then(Value::as_str).map(str::trim) {
        Some(text) if !text.is_empty() => format!("{label}: {}\n", escape_html(text)),
        _ => String::new(),
    }
}

fn status_label(data: &Value, key: &str) -> String {
    let Some(raw) = data.get(key).and_then(Value::as_str) else {
        return MISSING.to_string();
    };

    match raw {
        "created" => "Создан".to_string(),
        "assigned" => "Назначен водитель".to_string(),
        "in_transit" => "В пути".to_string(),
        "warehouse" => "На складе".to_string(),
        "delivered" => "Доставлен".to_string(),
        "delayed" => "Задерживается".to_string(),
        other => escape_html(other),
    }
}

pub fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(ch),
        }
    }
    out
}
