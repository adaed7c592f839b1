//! Keyword rules mapping free-text symptoms to doctor specialties.
//!
//! Matching is plain substring containment on the lower-cased, trimmed
//! input. Every rule that hits contributes its label, so overlapping
//! keywords (`headache` is both neurological and general) yield a union in
//! rule declaration order.

/// Used when non-empty input matches no rule.
pub const DEFAULT_SPECIALTY: &str = "General Physician";

#[derive(Debug, Clone, Copy)]
pub struct SpecialtyRule {
    pub label: &'static str,
    pub keywords: &'static [&'static str],
}

pub const SPECIALTY_RULES: &[SpecialtyRule] = &[
    SpecialtyRule {
        label: "Cardiologist",
        keywords: &[
            "heart pain", "chest pain", "palpitation", "heart attack",
            "high blood pressure", "hypertension", "irregular heartbeat",
            "shortness of breath",
        ],
    },
    SpecialtyRule {
        label: "Neurologist",
        keywords: &[
            "headache", "migraine", "seizure", "dizziness", "numbness",
            "tingling", "memory loss", "tremor", "stroke",
        ],
    },
    SpecialtyRule {
        label: "Dermatologist",
        keywords: &[
            "rash", "acne", "itching", "itchy", "eczema", "psoriasis",
            "skin", "hair loss", "mole",
        ],
    },
    SpecialtyRule {
        label: "Orthopedic",
        keywords: &[
            "joint pain", "back pain", "knee pain", "fracture", "sprain",
            "bone", "shoulder pain", "neck pain",
        ],
    },
    SpecialtyRule {
        label: "Gastroenterologist",
        keywords: &[
            "stomach", "abdominal pain", "diarrhea", "constipation",
            "acid reflux", "heartburn", "vomiting", "bloating",
        ],
    },
    SpecialtyRule {
        label: "Pediatrician",
        keywords: &["my child", "my baby", "infant", "toddler", "vaccination"],
    },
    SpecialtyRule {
        label: "Gynecologist",
        keywords: &[
            "pregnan", "menstrual", "period pain", "irregular period",
            "pelvic pain", "vaginal",
        ],
    },
    SpecialtyRule {
        label: "ENT Specialist",
        keywords: &[
            "ear pain", "earache", "sore throat", "sinus", "hearing loss",
            "tonsil", "nosebleed",
        ],
    },
    SpecialtyRule {
        label: "Ophthalmologist",
        keywords: &["eye pain", "blurred vision", "blurry vision", "red eye", "vision loss"],
    },
    SpecialtyRule {
        label: "Psychiatrist",
        keywords: &["anxiety", "depression", "panic attack", "insomnia", "mood swings"],
    },
    SpecialtyRule {
        label: DEFAULT_SPECIALTY,
        keywords: &[
            "fever", "cold", "cough", "flu", "fatigue", "headache",
            "body ache", "weakness", "sore muscles",
        ],
    },
];

/// Every label a doctor can hold, in rule order.
pub fn known_specialties() -> impl Iterator<Item = &'static str> {
    SPECIALTY_RULES.iter().map(|rule| rule.label)
}

/// Case-insensitive match of `name` against the known labels.
pub fn resolve_specialty(name: &str) -> Option<&'static str> {
    let name = name.trim();
    known_specialties().find(|label| label.eq_ignore_ascii_case(name))
}

/// Maps symptom text to an ordered, duplicate-free set of specialty labels.
pub fn classify(text: &str) -> Vec<&'static str> {
    let normalized = text.trim().to_lowercase();
    if normalized.is_empty() {
        return Vec::new();
    }

    if let Some(label) = resolve_specialty(&normalized) {
        return vec![label];
    }

    let mut labels: Vec<&'static str> = Vec::new();
    for rule in SPECIALTY_RULES {
        let hit = rule.keywords.iter().any(|kw| normalized.contains(kw));
        if hit && !labels.contains(&rule.label) {
            labels.push(rule.label);
        }
    }

    if labels.is_empty() {
        labels.push(DEFAULT_SPECIALTY);
    }

    labels
}

/// The rule table phrased as instructions for a completion model.
pub fn rules_as_guidance() -> String {
    let mut guidance = String::from(
        "Map the patient's symptoms to doctor specialties using these rules:\n",
    );
    for rule in SPECIALTY_RULES {
        guidance.push_str(&format!(
            "- {}: {}\n",
            rule.label,
            rule.keywords.join(", ")
        ));
    }
    guidance.push_str(&format!(
        "If the patient names a specialty directly, use it. If nothing matches, use {}.\n",
        DEFAULT_SPECIALTY
    ));
    guidance
}
