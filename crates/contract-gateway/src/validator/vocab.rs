//! Static lookup tables used by the prompt validator

/// Nouns naming a kind of business
pub const BUSINESS_ENTITIES: &[&str] = &[
    "company",
    "business",
    "corporation",
    "enterprise",
    "startup",
    "firm",
    "organization",
    "saas",
    "software",
    "app",
    "platform",
    "service",
    "website",
    "ecommerce",
    "store",
    "restaurant",
    "hotel",
    "clinic",
    "agency",
    "consulting",
    "freelance",
    "contractor",
];

/// Nouns naming something a business does or sells
pub const BUSINESS_ACTIVITIES: &[&str] = &[
    "service",
    "services",
    "product",
    "products",
    "consulting",
    "development",
    "design",
    "marketing",
    "sales",
    "support",
    "maintenance",
    "hosting",
    "subscription",
    "membership",
    "delivery",
    "shipping",
    "payment",
    "billing",
    "customer",
    "client",
    "user",
    "subscriber",
];

/// Legal vocabulary; any one of these admits a prompt on its own
pub const LEGAL_TERMS: &[&str] = &[
    "terms",
    "service",
    "agreement",
    "contract",
    "policy",
    "privacy",
    "liability",
    "warranty",
    "refund",
    "cancellation",
    "termination",
    "dispute",
    "governance",
];

/// A pattern whose match marks a prompt as not describing a business.
pub struct NonBusinessPattern {
    pub name: &'static str,
    pub pattern: &'static str,
    /// Capture groups that must differ (case-insensitively) for a match to count
    pub distinct_groups: Option<(usize, usize)>,
}

/// Matched case-insensitively against the trimmed prompt, in order.
pub const NON_BUSINESS_PATTERNS: &[NonBusinessPattern] = &[
    NonBusinessPattern {
        name: "call_reference",
        pattern: r"\b(voice call|phone call|call)\s+(to|with)\s+\w+",
        distinct_groups: None,
    },
    NonBusinessPattern {
        name: "month_pair",
        pattern: r"\b(january|february|march|april|may|june|july|august|september|october|november|december)\s+(and|with)\s+(january|february|march|april|may|june|july|august|september|october|november|december)",
        distinct_groups: Some((1, 3)),
    },
    NonBusinessPattern {
        name: "greeting",
        pattern: r"\b(hello|hi|hey)\s+(there|you)\b",
        distinct_groups: None,
    },
    NonBusinessPattern {
        name: "small_talk",
        pattern: r"\b(how are you|what's up|good morning|good afternoon|good evening)\b",
        distinct_groups: None,
    },
    NonBusinessPattern {
        name: "test_input",
        pattern: r"\b(test|testing|just testing|random|nonsense|gibberish)\b",
        distinct_groups: None,
    },
    NonBusinessPattern {
        name: "no_letters",
        pattern: r"^[^a-zA-Z]*$",
        distinct_groups: None,
    },
    NonBusinessPattern {
        name: "digits_only",
        pattern: r"^\d+$",
        distinct_groups: None,
    },
    NonBusinessPattern {
        name: "short_letters",
        pattern: r"^[a-zA-Z]{1,3}$",
        distinct_groups: None,
    },
];
