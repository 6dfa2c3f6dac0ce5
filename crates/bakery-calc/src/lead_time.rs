//! 提前期計算（日曆天，不考慮工作日）

use chrono::{Days, NaiveDate, NaiveDateTime};

/// 提前期計算器
pub struct LeadTimeCalculator;

impl LeadTimeCalculator {
    /// 計算開始日期（由交期向前推算提前期）
    pub fn calculate_start_date(due_date: NaiveDate, lead_time_days: u32) -> NaiveDate {
        due_date
            .checked_sub_days(Days::new(u64::from(lead_time_days)))
            .unwrap_or(NaiveDate::MIN)
    }

    /// 由交期時間點推算開始日期（只取日期部分）
    pub fn start_date_for(due_at: NaiveDateTime, lead_time_days: u32) -> NaiveDate {
        Self::calculate_start_date(due_at.date(), lead_time_days)
    }
}
