//! Prompt builder — merges persona, menu context and caller history.

use chrono::{Local, NaiveTime};

use crate::chat::{ChatMessage, Role};
use crate::persona::{ImagePolicy, Persona, SchedulePolicy};

/// Build the message list sent to the model.
///
/// The result starts with exactly one synthesized system message; every
/// system message in `history` is dropped and the rest keep their order.
pub fn build_messages(
    persona: &Persona,
    menu_context: &str,
    history: &[ChatMessage],
) -> Vec<ChatMessage> {
    build_messages_at(persona, menu_context, history, Local::now().time())
}

/// [`build_messages`] with an explicit local time of day.
pub fn build_messages_at(
    persona: &Persona,
    menu_context: &str,
    history: &[ChatMessage],
    now: NaiveTime,
) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(history.len() + 1);
    messages.push(ChatMessage::system(system_prompt(persona, menu_context, now)));
    messages.extend(
        history
            .iter()
            .filter(|m| m.role != Role::System)
            .cloned(),
    );
    messages
}

/// Render the system prompt text.
pub fn system_prompt(persona: &Persona, menu_context: &str, now: NaiveTime) -> String {
    let mut out = format!(
        "Eres el {} de \"{}\" en {}.\n\nTU PERSONALIDAD:\n",
        persona.role, persona.restaurant, persona.location
    );

    if persona.catchphrases.is_empty() {
        out.push_str(&format!("- {}.\n", persona.tone));
    } else {
        let phrases: Vec<String> = persona
            .catchphrases
            .iter()
            .map(|p| format!("\"{p}\""))
            .collect();
        out.push_str(&format!("- {} (usa {}).\n", persona.tone, phrases.join(", ")));
    }
    out.push_str(&format!("- {}\n", persona.goal));

    out.push_str("\nDATOS DEL MENÚ (Usa esto para responder precios y descripciones):\n");
    out.push_str(menu_context);
    out.push_str("\n\nREGLAS PARA RESPONDER:\n");

    for (i, rule) in rules(persona, now).iter().enumerate() {
        out.push_str(&format!("{}. {rule}\n", i + 1));
    }
    out
}

fn rules(persona: &Persona, now: NaiveTime) -> Vec<String> {
    let mut rules = vec![
        format!("Si el usuario saluda, di: \"{}\".", persona.greeting),
        "Cuando des un precio, sé exacto según los DATOS DEL MENÚ.".to_string(),
    ];

    let template = persona.image_url_template();
    match persona.images {
        ImagePolicy::Never => {
            rules.push("No incluyas fotos ni enlaces de imágenes en tus respuestas.".to_string())
        }
        ImagePolicy::OnRequest => rules.push(format!(
            "Si recomiendas un plato, incluye su FOTO solo si el usuario te la pide, usando \
             este formato exacto al final de la línea:\n   ![foto]({template})\n   \
             (Reemplaza ID por el id que viene en la base de datos, ej: 01, 20)."
        )),
        ImagePolicy::Always => rules.push(format!(
            "Cada vez que recomiendes un plato, incluye su FOTO usando este formato exacto \
             al final de la línea:\n   ![foto]({template})\n   \
             (Reemplaza ID por el id que viene en la base de datos, ej: 01, 20)."
        )),
    }

    if let Some(link) = &persona.purchase_link {
        rules.push(format!(
            "Tú no tomas pedidos ni cobras. Si el usuario quiere comprar o encargar algo, \
             invítalo a escribirnos por WhatsApp: {link}"
        ));
    }

    match &persona.schedule {
        SchedulePolicy::AllDay => rules.push(
            "No importa la hora del día: si el usuario pide desayunos o almuerzos, dale las \
             opciones que ofrecemos."
                .to_string(),
        ),
        SchedulePolicy::Hours { breakfast, lunch } => {
            let serving = if breakfast.contains(now) {
                "Ahora mismo se sirven desayunos."
            } else if lunch.contains(now) {
                "Ahora mismo se sirven almuerzos."
            } else {
                "Ahora mismo la cocina no sirve desayunos ni almuerzos."
            };
            rules.push(format!(
                "La hora actual es {}. Los desayunos se sirven de {} a {} y los almuerzos de {} \
                 a {}. {serving} Si el usuario pide algo fuera de su horario, dile amablemente \
                 cuándo puede pedirlo.",
                now.format("%H:%M"),
                breakfast.from.format("%H:%M"),
                breakfast.until.format("%H:%M"),
                lunch.from.format("%H:%M"),
                lunch.until.format("%H:%M"),
            ))
        }
    }

    rules
}
