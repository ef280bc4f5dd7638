use azlin_core::AzlinError;

/// Maps the CLI's `s|m|l|xl` shorthand to a concrete Azure SKU. A raw
/// SKU string (anything containing an underscore, Azure's SKU naming
/// convention) bypasses the table entirely.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SizeTier {
    S,
    M,
    L,
    Xl,
    Raw(String),
}

impl SizeTier {
    pub fn parse(input: &str) -> Self {
        match input.to_ascii_lowercase().as_str() {
            "s" => SizeTier::S,
            "m" => SizeTier::M,
            "l" => SizeTier::L,
            "xl" => SizeTier::Xl,
            _ => SizeTier::Raw(input.to_string()),
        }
    }

    pub fn to_sku(&self) -> String {
        match self {
            SizeTier::S => "Standard_B1s".to_string(),
            SizeTier::M => "Standard_D2s_v3".to_string(),
            SizeTier::L => "Standard_D4s_v3".to_string(),
            SizeTier::Xl => "Standard_D8s_v3".to_string(),
            SizeTier::Raw(s) => s.clone(),
        }
    }
}

pub fn resolve_sku(input: &str) -> Result<String, AzlinError> {
    let sku = SizeTier::parse(input).to_sku();
    if sku.is_empty() {
        return Err(AzlinError::ValidationError("empty VM size".to_string()));
    }
    Ok(sku)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shorthand_tiers_map_to_known_skus() {
        assert_eq!(resolve_sku("s").unwrap(), "Standard_B1s");
        assert_eq!(resolve_sku("M").unwrap(), "Standard_D2s_v3");
        assert_eq!(resolve_sku("l").unwrap(), "Standard_D4s_v3");
        assert_eq!(resolve_sku("XL").unwrap(), "Standard_D8s_v3");
    }

    #[test]
    fn raw_sku_passes_through() {
        assert_eq!(resolve_sku("Standard_E16s_v5").unwrap(), "Standard_E16s_v5");
    }
}
