//! Fixed Spanish reply texts and the formatters that fill them in.
//! Rejection messages are constants so every rejection reads exactly the same.

use crate::{
    core::{
        entry::{EntryKind, Field, Fragment, UnsupportedReason},
        report::format_amount,
    },
    entities::transaction,
};
use chrono_tz::Tz;

/// Reply to any message that is not in Spanish
pub const LANGUAGE_UNSUPPORTED: &str = "🇵🇪 Solo puedo ayudarte en español. Escríbeme, por ejemplo: \"gasto S/25 en comida hoy\".";

/// Reply to any message that mentions a currency other than soles
pub const CURRENCY_UNSUPPORTED: &str = "💱 Solo registro montos en soles (PEN). Escribe el monto en soles, por ejemplo: \"gasto S/25 en comida\".";

/// Reply when no financial entry could be read
pub const UNPARSEABLE: &str = "🤔 No entendí tu mensaje. Prueba con \"gasto S/25 en comida\" o escribe \"ayuda\".";

/// Reply when storage failed; nothing was saved
pub const RETRY_LATER: &str = "❌ Hubo un error procesando tu mensaje. Por favor intenta de nuevo o escribe 'ayuda'.";

/// Reply when too many codes were requested
pub const RATE_LIMITED: &str = "⚠️ Has solicitado demasiados códigos. Intenta en una hora.";

/// Reply to a bare `reporte`
pub const ASK_PERIOD: &str = "📊 ¿Qué reporte quieres? Escribe \"reporte semanal\", \"reporte mensual\" o \"reporte anual\".";

/// Reply to a malformed `registrar` command
pub const REGISTER_USAGE: &str = "📝 Para registrar tu perfil escribe: registrar <nombre> <email>";

/// Reply when the email in `registrar` is not an address
pub const INVALID_EMAIL: &str = "❌ Ese email no parece válido. Escribe: registrar <nombre> <email>";

/// Greeting for a number seen for the first time
pub const WELCOME: &str = "👋 ¡Hola! Soy tu asistente financiero personal. Para empezar, cuéntame tu nombre y email escribiendo: registrar <nombre> <email>";

/// Message for a rejected entry
#[must_use]
pub const fn unsupported(reason: UnsupportedReason) -> &'static str {
    match reason {
        UnsupportedReason::Language => LANGUAGE_UNSUPPORTED,
        UnsupportedReason::WrongCurrency => CURRENCY_UNSUPPORTED,
        UnsupportedReason::Unparseable => UNPARSEABLE,
    }
}

/// Follow-up question for the first missing field.
#[must_use]
pub fn ask_field(field: Field, fragment: &Fragment) -> String {
    match field {
        Field::Type => match fragment.amount {
            Some(amount) => format!("🤔 ¿{} fue un gasto o un ingreso?", format_amount(amount)),
            None => "🤔 ¿Es un gasto o un ingreso?".to_string(),
        },
        Field::Amount => {
            "💵 ¿Cuánto fue? Indica el monto en soles (por ejemplo: S/25).".to_string()
        }
        Field::Category => {
            let examples = match fragment.kind {
                Some(EntryKind::Income) => "salario, freelance, regalos",
                _ => "comida, transporte, ropa",
            };
            match fragment.amount {
                Some(amount) => format!(
                    "🏷️ ¿En qué categoría va {}? (por ejemplo: {examples})",
                    format_amount(amount)
                ),
                None => format!("🏷️ ¿En qué categoría va? (por ejemplo: {examples})"),
            }
        }
    }
}

/// Confirmation for a committed transaction, e.g.
/// `✅ Gasto registrado: S/ 25.00 en comida (14/10/2026).`
#[must_use]
pub fn confirmation(saved: &transaction::Model, tz: Tz) -> String {
    let label = EntryKind::from_db(&saved.transaction_type).map_or("Movimiento", EntryKind::label);
    format!(
        "✅ {label} registrado: {} en {} ({}).",
        format_amount(saved.amount),
        saved.category,
        saved.occurred_at.with_timezone(&tz).format("%d/%m/%Y")
    )
}

/// Message carrying a freshly issued code
#[must_use]
pub fn otp_issued(code: &str, ttl_minutes: i64, dashboard_url: Option<&str>) -> String {
    let mut reply = format!("🔐 Tu código es: {code}\n⏱️ Expira en {ttl_minutes} minutos.");
    if let Some(url) = dashboard_url {
        reply.push_str("\n\n📊 Ingresa a tu dashboard:\n");
        reply.push_str(url);
    }
    reply
}

/// Puts the welcome in front of a first reply.
///
/// Language and currency rejections stay exactly as they are.
#[must_use]
pub fn with_welcome(reply: String) -> String {
    if reply == LANGUAGE_UNSUPPORTED || reply == CURRENCY_UNSUPPORTED {
        return reply;
    }
    format!("{WELCOME}\n\n{reply}")
}

/// Confirmation for `registrar`
#[must_use]
pub fn profile_saved(name: &str, email: &str) -> String {
    format!(
        "✅ ¡Perfecto {name}! Tu perfil ha sido registrado con el email {email}. Ahora puedes empezar a registrar tus gastos e ingresos."
    )
}

/// Usage instructions
#[must_use]
pub fn help_text(dashboard_url: Option<&str>) -> String {
    let mut help = String::from(
        "📱 *Asistente Financiero Personal*\n\n\
        *Registrar gastos:*\n\
        • \"gasto S/25 en comida hoy\"\n\
        • \"Gasté 50 soles en comida ayer\"\n\
        • \"Pagué 30 en el taxi\"\n\n\
        *Registrar ingresos:*\n\
        • \"Me pagaron 3000 de sueldo\"\n\
        • \"ingreso S/500 en freelance 12/10\"\n\n\
        *Ver reportes:*\n\
        • \"reporte semanal\"\n\
        • \"reporte mensual\" (mes anterior)\n\
        • \"reporte anual\"\n\n\
        *Otros:*\n\
        • \"código\" - Genera un código para el dashboard\n\
        • \"registrar <nombre> <email>\" - Guarda tu perfil\n\
        • \"ayuda\" - Muestra este mensaje\n",
    );
    if let Some(url) = dashboard_url {
        help.push_str("\n📊 *Dashboard de gastos:*\n");
        help.push_str(url);
        help.push('\n');
    }
    help.push_str(
        "\n💡 Entiendo jerga peruana como \"chifita\", \"tabas\" o \"lucas\".\n\
        💰 Todos los montos son en soles (PEN).",
    );
    help
}
