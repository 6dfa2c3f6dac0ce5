//! 蛋糕層幾何估算

use rust_decimal::Decimal;

/// 幾何估算器（由外部提供，核心只當作不透明函數使用）
pub trait GeometryEstimator: Send + Sync {
    /// 由尺寸描述取得直徑（英吋）
    fn diameter_of(&self, size: &str) -> Option<Decimal>;

    /// 表面積（平方英吋）
    fn surface_area(&self, diameter: Decimal, height: Decimal) -> Decimal;

    /// 預估糖霜重量（克）
    fn frosting_mass(&self, diameter: Decimal, height: Decimal, complexity: u8) -> Decimal;
}

/// 標準圓形蛋糕估算
///
/// 表面積 = 頂面圓 + 側面（π r² + π d h），糖霜重量再乘上複雜度係數。
#[derive(Debug, Clone)]
pub struct StandardGeometry {
    /// 每平方英吋糖霜（克）
    pub grams_per_sq_inch: Decimal,
}

/// 圓周率（15 位小數）
fn pi() -> Decimal {
    Decimal::new(3_141_592_653_589_793, 15)
}

impl StandardGeometry {
    pub fn new(grams_per_sq_inch: Decimal) -> Self {
        Self { grams_per_sq_inch }
    }

    /// 複雜度係數：1 → 1.0、2 → 1.25、3 → 1.5
    pub fn complexity_factor(complexity: u8) -> Decimal {
        match complexity.clamp(1, 3) {
            1 => Decimal::ONE,
            2 => Decimal::new(125, 2),
            _ => Decimal::new(15, 1),
        }
    }
}

impl Default for StandardGeometry {
    fn default() -> Self {
        Self::new(Decimal::new(25, 1))
    }
}

impl GeometryEstimator for StandardGeometry {
    fn diameter_of(&self, size: &str) -> Option<Decimal> {
        // 取第一段數字，例如 8"、10 inch、6.5in round
        let number: String = size
            .trim_start()
            .chars()
            .skip_while(|c| !c.is_ascii_digit())
            .take_while(|c| c.is_ascii_digit() || *c == '.')
            .collect();

        number
            .trim_end_matches('.')
            .parse::<Decimal>()
            .ok()
            .filter(|d| *d > Decimal::ZERO)
    }

    fn surface_area(&self, diameter: Decimal, height: Decimal) -> Decimal {
        let radius = diameter / Decimal::from(2);
        let top = pi() * radius * radius;
        let side = pi() * diameter * height;
        (top + side).round_dp(2)
    }

    fn frosting_mass(&self, diameter: Decimal, height: Decimal, complexity: u8) -> Decimal {
        (self.surface_area(diameter, height)
            * self.grams_per_sq_inch
            * Self::complexity_factor(complexity))
        .round_dp(2)
    }
}
