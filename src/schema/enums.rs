/// Enum yang di-backing oleh i32
///
/// Nilai default (field tidak ditulis) selalu 0, meskipun 0 tidak dideklarasikan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnumDef {
    name: String,
    variants: Vec<(String, i32)>,
}

impl EnumDef {
    pub fn new<N, V>(name: impl Into<String>, variants: V) -> Self
    where
        N: Into<String>,
        V: IntoIterator<Item = (N, i32)>,
    {
        Self {
            name: name.into(),
            variants: variants
                .into_iter()
                .map(|(variant, value)| (variant.into(), value))
                .collect(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn variants(&self) -> &[(String, i32)] {
        &self.variants
    }

    /// Nama variant untuk nilai tertentu
    pub fn name_of(&self, value: i32) -> Option<&str> {
        self.variants
            .iter()
            .find(|(_, v)| *v == value)
            .map(|(name, _)| name.as_str())
    }

    #[inline]
    pub fn contains(&self, value: i32) -> bool {
        self.variants.iter().any(|(_, v)| *v == value)
    }
}
