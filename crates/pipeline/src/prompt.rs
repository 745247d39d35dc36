//! Prompt composition.
//!
//! The composed prompt is one string with a fixed section order:
//! behavior rules, the observation block, the retrieved-strategy block
//! (with an extra no-evidence warning when retrieval found nothing), the
//! standing instructions, and — only under fallback — a final instruction
//! demanding professional validation. The ordering and the fallback
//! augmentation steer model behavior under the no-evidence condition and
//! must not be reordered.
//!
//! Structural JSON keys are demanded in English; all content values in
//! Spanish.

use apoyo_config::PromptConfig;
use apoyo_core::request::SupportRequest;
use apoyo_core::retrieval::RetrievalOutcome;

/// Standing behavior rules, sent at the top of every prompt.
pub const SYSTEM_PROMPT: &str = "\
Eres un asistente educativo para maestros y padres.
Tu tarea es generar apoyos educativos basados SOLO en observaciones del reporte del alumno.

Reglas obligatorias:
- NO emitas diagnósticos.
- NO uses etiquetas clínicas (ej. TDAH, autismo, Asperger, trastorno, DSM).
- Usa lenguaje educativo, observacional y práctico.
- No hagas afirmaciones médicas.
- Devuelve SOLO JSON válido, sin texto extra.
- El JSON debe seguir EXACTAMENTE la estructura solicitada.
- IMPORTANTE: Las llaves del JSON DEBEN estar en inglés exactamente como se especifica (teacher_version.summary, signals_detected, recommendations, classroom_plan_7_days, etc.).
- NO traduzcas las llaves.
- Si respondes con llaves distintas, la respuesta será rechazada.";

/// Builds prompts from a request and its retrieval outcome.
pub struct PromptComposer {
    snippet_max_chars: usize,
}

impl PromptComposer {
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            snippet_max_chars: config.snippet_max_chars,
        }
    }

    /// Compose the full prompt for one generation run.
    pub fn compose(&self, request: &SupportRequest, outcome: &RetrievalOutcome) -> String {
        let fallback_used = outcome.fallback_used();

        let mut prompt = String::with_capacity(4096);
        prompt.push_str(SYSTEM_PROMPT);
        prompt.push_str("\n\n");
        prompt.push_str(&build_user_prompt(request));
        prompt.push_str("\n\n");

        prompt.push_str("=== Estrategias disponibles (RAG) ===\n");
        if fallback_used {
            prompt.push_str(
                "(NO SE ENCONTRARON estrategias relevantes para este caso. \
                 Puedes proponer sugerencias generales y prácticas, pero NO digas \
                 que vienen del playbook.)\n",
            );
        }
        prompt.push_str(&self.render_strategies(outcome));
        prompt.push_str("\n\n");

        prompt.push_str("Instrucciones adicionales:\n");
        prompt.push_str("- Prioriza estas estrategias cuando sean relevantes.\n");
        prompt.push_str(
            "- Si el bloque de estrategias está vacío o indica que no se encontraron \
             estrategias, propón recomendaciones generales y prácticas, sencillas y seguras.\n",
        );
        prompt.push_str("- Si algo no aplica, di 'No aplica' y sugiere una alternativa simple.\n");
        prompt.push_str("- No incluyas nombres propios ni datos sensibles.\n");
        prompt.push_str("- Mantén español claro y natural.\n");
        prompt.push_str("- No uses lenguaje clínico/diagnóstico.\n");

        // Under fallback the language must be even more conservative.
        if fallback_used {
            prompt.push_str(
                "- IMPORTANTE: estas recomendaciones son generales y deben ser \
                 validadas por profesionales.\n",
            );
        }

        prompt
    }

    /// Render the retrieved strategies grouped per context, each snippet
    /// capped for prompt legibility, with an explicit notice for contexts
    /// that matched nothing.
    fn render_strategies(&self, outcome: &RetrievalOutcome) -> String {
        let mut blocks: Vec<String> = Vec::new();

        for (context, results) in outcome.iter() {
            blocks.push(format!("## Contexto: {}", context.to_uppercase()));

            if results.is_empty() {
                blocks.push("No hay estrategias relevantes para este contexto.".into());
                continue;
            }

            for strategy in outcome.iter_strategies().filter(|s| s.context == context) {
                blocks.push(format!(
                    "[Playbook {}]\n{}",
                    strategy.rank,
                    format_snippet(strategy.body, self.snippet_max_chars)
                ));
            }
        }

        blocks.join("\n\n")
    }
}

/// The observation block plus the exact output shape the model must follow.
pub fn build_user_prompt(request: &SupportRequest) -> String {
    format!(
        r#"Alumno: {name}
Edad: {age}
Grupo: {group}

Reporte (observaciones):
{report}

Tarea:
Devuelve SOLO un objeto JSON válido (sin markdown, sin ```json, sin texto extra).
Las llaves del JSON DEBEN estar en INGLÉS y EXACTAMENTE como en el ejemplo.
NO traduzcas las llaves.

El JSON debe incluir:
- teacher_version: summary, signals_detected, recommendations, classroom_plan_7_days
- parent_version: el nombre {name}, summary, signals_detected, recommendations, home_plan_7_days
- guardrails: no_diagnosis_confirmed=true y no_clinical_labels_confirmed=true

Asegúrate de que:
- signals_detected sean observables (conductas, momentos, contexto), no etiquetas clínicas.
- recommendations sean accionables y realistas (máximo 6).
- Los planes de 7 días tengan day 1..7.

Ejemplo de forma (NO copies el contenido, solo la forma):
{{
  "teacher_version": {{
    "summary": "...",
    "signals_detected": ["..."],
    "recommendations": [{{"title":"...","steps":["..."],"when_to_use":"..."}}],
    "classroom_plan_7_days": [{{"day": 1, "focus":"...","activity":"...","success_criteria":"..."}}]
  }},
  "parent_version": {{
    "summary": "...",
    "signals_detected": ["..."],
    "recommendations": [{{"title":"...","steps":["..."],"when_to_use":"..."}}],
    "home_plan_7_days": [{{"day": 1, "focus":"...","activity":"...","success_criteria":"..."}}]
  }},
  "guardrails": {{
    "no_diagnosis_confirmed": true,
    "no_clinical_labels_confirmed": true
  }}
}}"#,
        name = request.student_name,
        age = request.age,
        group = request.group,
        report = request.report_text,
    )
}

/// Cap one snippet for prompt legibility (not a model window limit).
fn format_snippet(text: &str, max_chars: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_chars {
        return trimmed.to_string();
    }
    let cut: String = trimmed.chars().take(max_chars).collect();
    format!("{cut}...")
}
