use std::borrow::Cow;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Tumor classes the bundled model is trained on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TumorClass {
    Glioma,
    Meningioma,
    Pituitary,
    General,
}

#[derive(Debug, Clone, Copy, Serialize)]
pub struct TumorInfo {
    pub class: TumorClass,
    pub title: &'static str,
    pub description: &'static str,
}

pub static TUMOR_INFO: [TumorInfo; 4] = [
    TumorInfo {
        class: TumorClass::Glioma,
        title: "Glioma",
        description: "Glioma is a common type of tumor that originates from glial cells in the brain or spine. \
            Gliomas can be low-grade (slow-growing) or high-grade (aggressive). Symptoms depend on the tumor's \
            location and may include headaches, seizures, or changes in personality. Treatment often involves \
            surgery, radiation therapy, and chemotherapy.",
    },
    TumorInfo {
        class: TumorClass::Meningioma,
        title: "Meningioma",
        description: "Meningioma is a tumor that arises from the meninges, the membranes that cover the brain and \
            spinal cord. Most meningiomas are benign, but their location in the brain can still cause serious \
            health problems. Common symptoms include headaches, vision problems, or seizures. Treatment may \
            involve surgical removal or observation in non-symptomatic cases.",
    },
    TumorInfo {
        class: TumorClass::Pituitary,
        title: "Pituitary tumor",
        description: "Pituitary tumors form in the pituitary gland, which controls several hormone-producing glands \
            in the body. These tumors may cause hormonal imbalances affecting growth, metabolism, and reproductive \
            functions. Treatment may include medication, hormone therapy, or surgery.",
    },
    TumorInfo {
        class: TumorClass::General,
        title: "Brain Tumor",
        description: "Brain Tumor is a general term for abnormal growths of cells in the brain. Tumors can be benign \
            (non-cancerous) or malignant (cancerous). They can affect brain function depending on their size and \
            location. Common treatments include surgery, radiation, and chemotherapy.",
    },
];

impl TumorClass {
    pub const ALL: [TumorClass; 4] = [
        TumorClass::Glioma,
        TumorClass::Meningioma,
        TumorClass::Pituitary,
        TumorClass::General,
    ];

    pub fn info(self) -> &'static TumorInfo {
        // TUMOR_INFO is indexed in declaration order
        &TUMOR_INFO[self as usize]
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TumorClass::Glioma => "glioma",
            TumorClass::Meningioma => "meningioma",
            TumorClass::Pituitary => "pituitary",
            TumorClass::General => "tumor",
        }
    }
}

impl fmt::Display for TumorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TumorClass {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "glioma" => Ok(TumorClass::Glioma),
            "meningioma" => Ok(TumorClass::Meningioma),
            "pituitary" => Ok(TumorClass::Pituitary),
            "tumor" | "general" => Ok(TumorClass::General),
            _ => Err(()),
        }
    }
}

/// Body text shown for labels without a stored description.
pub const FALLBACK_DESCRIPTION: &str = "Additional information will be added soon.";

/// Description for a model label. Unknown labels get a generic placeholder.
pub fn describe(label: &str) -> Cow<'static, str> {
    match label.parse::<TumorClass>() {
        Ok(class) => Cow::Borrowed(class.info().description),
        Err(()) => Cow::Owned(format!("{}: {FALLBACK_DESCRIPTION}", title_case(label.trim()))),
    }
}

/// Upper-cases the first letter of every run of letters and lower-cases the
/// rest. Separators such as `_` and digits are kept as they are.
pub fn title_case(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut in_word = false;
    for c in s.chars() {
        if in_word {
            out.extend(c.to_lowercase());
        } else {
            out.extend(c.to_uppercase());
        }
        in_word = c.is_alphabetic();
    }
    out
}
