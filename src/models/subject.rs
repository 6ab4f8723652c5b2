/// 科目枚举
///
/// 手写识别的后处理按科目查表替换符号
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subject {
    /// 数学
    Mathematics,
    /// 化学
    Chemistry,
    /// 物理
    Physics,
    /// 生物
    Biology,
    /// 英语
    English,
    /// 历史
    History,
    /// 计算机
    ComputerScience,
}

/// 数学符号识别纠正（按顺序替换）
const MATHEMATICS_CORRECTIONS: &[(&str, &str)] = &[
    ("x", "×"),
    ("/", "÷"),
    ("+-", "±"),
    ("<=", "≤"),
    (">=", "≥"),
    ("!=", "≠"),
];

/// 化学式识别纠正
const CHEMISTRY_CORRECTIONS: &[(&str, &str)] = &[("h20", "H₂O"), ("co2", "CO₂")];

impl Subject {
    /// 获取标准名称
    pub fn name(self) -> &'static str {
        match self {
            Subject::Mathematics => "mathematics",
            Subject::Chemistry => "chemistry",
            Subject::Physics => "physics",
            Subject::Biology => "biology",
            Subject::English => "english",
            Subject::History => "history",
            Subject::ComputerScience => "computer science",
        }
    }

    /// 尝试从字符串解析科目（大小写不敏感）
    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "mathematics" => Some(Subject::Mathematics),
            "chemistry" => Some(Subject::Chemistry),
            "physics" => Some(Subject::Physics),
            "biology" => Some(Subject::Biology),
            "english" => Some(Subject::English),
            "history" => Some(Subject::History),
            "computer science" | "computer_science" => Some(Subject::ComputerScience),
            _ => None,
        }
    }

    /// 该科目的识别纠正表
    pub fn corrections(self) -> &'static [(&'static str, &'static str)] {
        match self {
            Subject::Mathematics => MATHEMATICS_CORRECTIONS,
            Subject::Chemistry => CHEMISTRY_CORRECTIONS,
            _ => &[],
        }
    }

    /// 对识别文本做科目相关的纠正
    ///
    /// 先合并多余空白，再按表顺序替换
    pub fn post_process(self, text: &str) -> String {
        let mut text = text.split_whitespace().collect::<Vec<_>>().join(" ");
        for (from, to) in self.corrections() {
            text = text.replace(from, to);
        }
        text
    }
}

impl std::fmt::Display for Subject {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
