use std::fmt;

/// Queries whose success gates STANDARD/BASIC validation
pub const CRITICAL_QUERIES: [&str; 4] = [
    "tendencyQuery",
    "topTendencyQuery",
    "thinkingSkillsQuery",
    "careerRecommendationQuery",
];

/// Names kept in the catalog that have no backing statement yet
pub const RESERVED_QUERIES: [&str; 28] = [
    "jobMatchingQuery",
    "majorRecommendationQuery",
    "studyMethodQuery",
    "socialSkillsQuery",
    "leadershipQuery",
    "communicationQuery",
    "problemSolvingQuery",
    "creativityQuery",
    "analyticalThinkingQuery",
    "practicalThinkingQuery",
    "abstractThinkingQuery",
    "memoryQuery",
    "attentionQuery",
    "processingSpeedQuery",
    "spatialAbilityQuery",
    "verbalAbilityQuery",
    "numericalAbilityQuery",
    "reasoningQuery",
    "perceptionQuery",
    "motivationQuery",
    "interestQuery",
    "valueQuery",
    "workStyleQuery",
    "environmentPreferenceQuery",
    "teamworkQuery",
    "independenceQuery",
    "stabilityQuery",
    "challengeQuery",
];

/// Implemented assessment queries
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Tendency,
    TopTendency,
    ThinkingSkills,
    CareerRecommendation,
    BottomTendency,
    PersonalityDetail,
    StrengthsWeaknesses,
    LearningStyle,
    LearningStyleChart,
    CompetencyAnalysis,
    CompetencySubjects,
    CompetencyJobs,
    CompetencyJobMajors,
    Duties,
    ImagePreferenceStats,
    PreferenceData,
    PreferenceJobs,
}

impl QueryKind {
    pub const ALL: [QueryKind; 17] = [
        QueryKind::Tendency,
        QueryKind::TopTendency,
        QueryKind::ThinkingSkills,
        QueryKind::CareerRecommendation,
        QueryKind::BottomTendency,
        QueryKind::PersonalityDetail,
        QueryKind::StrengthsWeaknesses,
        QueryKind::LearningStyle,
        QueryKind::LearningStyleChart,
        QueryKind::CompetencyAnalysis,
        QueryKind::CompetencySubjects,
        QueryKind::CompetencyJobs,
        QueryKind::CompetencyJobMajors,
        QueryKind::Duties,
        QueryKind::ImagePreferenceStats,
        QueryKind::PreferenceData,
        QueryKind::PreferenceJobs,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            QueryKind::Tendency => "tendencyQuery",
            QueryKind::TopTendency => "topTendencyQuery",
            QueryKind::ThinkingSkills => "thinkingSkillsQuery",
            QueryKind::CareerRecommendation => "careerRecommendationQuery",
            QueryKind::BottomTendency => "bottomTendencyQuery",
            QueryKind::PersonalityDetail => "personalityDetailQuery",
            QueryKind::StrengthsWeaknesses => "strengthsWeaknessesQuery",
            QueryKind::LearningStyle => "learningStyleQuery",
            QueryKind::LearningStyleChart => "learningStyleChartQuery",
            QueryKind::CompetencyAnalysis => "competencyAnalysisQuery",
            QueryKind::CompetencySubjects => "competencySubjectsQuery",
            QueryKind::CompetencyJobs => "competencyJobsQuery",
            QueryKind::CompetencyJobMajors => "competencyJobMajorsQuery",
            QueryKind::Duties => "dutiesQuery",
            QueryKind::ImagePreferenceStats => "imagePreferenceStatsQuery",
            QueryKind::PreferenceData => "preferenceDataQuery",
            QueryKind::PreferenceJobs => "preferenceJobsQuery",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        QueryKind::ALL.iter().copied().find(|k| k.name() == name)
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

pub fn is_critical(name: &str) -> bool {
    CRITICAL_QUERIES.contains(&name)
}

pub fn is_reserved(name: &str) -> bool {
    RESERVED_QUERIES.contains(&name)
}

/// Ordered, duplicate-free list of query names to run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryCatalog {
    names: Vec<String>,
}

impl QueryCatalog {
    /// Catalog from arbitrary names; later duplicates are dropped
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut unique: Vec<String> = Vec::new();
        for name in names {
            let name = name.into();
            if !unique.contains(&name) {
                unique.push(name);
            }
        }
        Self { names: unique }
    }

    /// The 17 implemented queries followed by the reserved names
    pub fn standard() -> Self {
        Self::new(
            QueryKind::ALL
                .iter()
                .map(|k| k.name())
                .chain(RESERVED_QUERIES.iter().copied()),
        )
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|n| n == name)
    }
}

impl Default for QueryCatalog {
    fn default() -> Self {
        Self::standard()
    }
}
