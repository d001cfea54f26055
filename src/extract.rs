//! Structural HTML extraction for the registry's search and detail pages.
//!
//! Both pages are server-rendered, bilingual (every field carries a Chinese
//! and an English label node) and built out of nested tables whose exact
//! shape shifts between trials. Extraction is therefore label-driven and
//! defensive by default: a missing field stays empty, a missing section stays
//! `None`, and only rows satisfying the completeness invariant are emitted.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::record::{
    BasicInfo, ContactInfo, EthicsInfo, Intervention, RecruitmentInfo, SearchPagination,
    SponsorInfo, StudyInfo, TrialDetail, TrialListItem,
};
use crate::{RegistryError, Result};

fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css)
        .map_err(|e| RegistryError::Extraction(format!("Failed to parse selector: {:?}", e)))
}

fn regex(pattern: &str) -> Result<Regex> {
    Regex::new(pattern)
        .map_err(|e| RegistryError::Extraction(format!("Failed to compile pattern: {}", e)))
}

/// Concatenated, trimmed text of an element.
fn text_of(element: ElementRef) -> String {
    element.text().collect::<String>().trim().to_string()
}

fn has_class(element: ElementRef, class: &str) -> bool {
    element.value().classes().any(|c| c == class)
}

/// Parses one search results page into rows plus best-effort pagination
/// metadata.
///
/// Rows missing any of registration number, title or project id are dropped
/// whole; a page without the results table yields an empty list, never an
/// error.
pub fn parse_search_results(html: &str) -> Result<(Vec<TrialListItem>, SearchPagination)> {
    let document = Html::parse_document(html);

    let row_sel = selector("table.table1 tr")?;
    let cell_sel = selector("td")?;
    let title_link_sel = selector("a.tit1")?;
    let institution_sel = selector("p")?;
    let proj_re = regex(r"proj=(\d+)")?;

    let mut results = Vec::new();

    for (index, row) in document.select(&row_sel).enumerate() {
        if index == 0 {
            continue; // header row
        }

        let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
        if cells.len() < 5 {
            continue;
        }

        let registration_number = text_of(cells[1]);
        let title_link = cells[2].select(&title_link_sel).next();
        let title = title_link
            .map(|link| {
                link.value()
                    .attr("title")
                    .map(|t| t.trim().to_string())
                    .filter(|t| !t.is_empty())
                    .unwrap_or_else(|| text_of(link))
            })
            .unwrap_or_default();
        let institution = cells[2]
            .select(&institution_sel)
            .next()
            .map(text_of)
            .unwrap_or_default();
        let study_type = text_of(cells[3]);
        let registration_date = text_of(cells[4]);

        let project_id = title_link
            .and_then(|link| link.value().attr("href"))
            .and_then(|href| proj_re.captures(href))
            .map(|caps| caps[1].to_string())
            .unwrap_or_default();

        if registration_number.is_empty() || title.is_empty() || project_id.is_empty() {
            continue;
        }

        results.push(TrialListItem {
            registration_number,
            project_id,
            title,
            study_type,
            registration_date,
            institution,
        });
    }

    let pagination = parse_pagination(&document)?;
    Ok((results, pagination))
}

/// Best-effort pagination scrape. The counters are free text and not
/// guaranteed adjacent; treat the output as advisory only.
fn parse_pagination(document: &Html) -> Result<SearchPagination> {
    let mut pagination = SearchPagination::default();

    let number_re = regex(r"\d+")?;

    // Total-records block: the dedicated counter element, or any div
    // carrying the 共检索到 phrase, or the pager box as a last resort.
    let total_sel = selector("#data-total")?;
    let div_sel = selector("div")?;
    let pager_sel = selector("div.pagerbox")?;
    let total_text = document
        .select(&total_sel)
        .next()
        .map(text_of)
        .filter(|t| !t.is_empty())
        .or_else(|| {
            document
                .select(&div_sel)
                .map(text_of)
                .find(|t| t.contains("共检索到"))
        })
        .or_else(|| document.select(&pager_sel).next().map(text_of))
        .unwrap_or_default();

    let mut numbers = number_re
        .find_iter(&total_text)
        .filter_map(|m| m.as_str().parse::<u32>().ok());
    if let Some(first) = numbers.next() {
        pagination.total_results = first;
        // A second integer in the same block is usually the page count,
        // though nothing guarantees it.
        if let Some(second) = numbers.next() {
            pagination.total_pages = second;
        }
    }

    // Paging controls refine the totals when present.
    let paging_sel = selector("div.pagination, .page, .pagerbox")?;
    let paging_text = document
        .select(&paging_sel)
        .map(text_of)
        .collect::<Vec<_>>()
        .join(" ");
    if !paging_text.is_empty() {
        let total_pages_re = regex(r"共\s*(\d+)\s*页")?;
        if let Some(caps) = total_pages_re.captures(&paging_text) {
            if let Ok(pages) = caps[1].parse() {
                pagination.total_pages = pages;
            }
        }
        let current_re = regex(r"第\s*(\d+)\s*页")?;
        if let Some(caps) = current_re.captures(&paging_text) {
            if let Ok(page) = caps[1].parse() {
                pagination.current_page = page;
            }
        }
    }

    Ok(pagination)
}

/// Which language node of a labeled row a schema entry matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    Cn,
    En,
}

/// One labeled row lifted out of the detail page's nested tables:
/// the Chinese label node, its sibling English label node, and the adjacent
/// value cell's text.
struct LabeledRow {
    cn: String,
    en: String,
    value: String,
}

/// Flat index over every labeled row in the document, in document order.
///
/// This is the single generic lookup primitive behind the 30+ detail fields:
/// match a label substring against the chosen language node, first match with
/// a non-empty value wins. Duplicate labels across sections are possible and
/// not disambiguated.
struct LabelIndex {
    rows: Vec<LabeledRow>,
}

impl LabelIndex {
    fn build(document: &Html) -> Result<Self> {
        let row_sel = selector("table tr")?;
        let cn_sel = selector(".left_title p.cn")?;
        let en_sel = selector(".left_title p.en")?;
        let cell_sel = selector("td")?;

        let mut rows = Vec::new();
        for row in document.select(&row_sel) {
            let cn = row.select(&cn_sel).next().map(text_of).unwrap_or_default();
            let en = row.select(&en_sel).next().map(text_of).unwrap_or_default();
            if cn.is_empty() && en.is_empty() {
                continue;
            }
            let value = row
                .select(&cell_sel)
                .find(|cell| !has_class(*cell, "left_title"))
                .map(text_of)
                .unwrap_or_default();
            rows.push(LabeledRow { cn, en, value });
        }
        Ok(Self { rows })
    }

    fn lookup(&self, lang: Lang, label: &str) -> String {
        self.rows
            .iter()
            .filter(|row| match lang {
                Lang::Cn => row.cn.contains(label),
                Lang::En => row.en.contains(label),
            })
            .map(|row| row.value.clone())
            .find(|value| !value.is_empty())
            .unwrap_or_default()
    }

    /// Chinese-label lookup.
    fn cn(&self, label: &str) -> String {
        self.lookup(Lang::Cn, label)
    }

    /// English-label lookup.
    fn en(&self, label: &str) -> String {
        self.lookup(Lang::En, label)
    }

    /// Chinese-label lookup returning `None` for an empty value.
    fn cn_opt(&self, label: &str) -> Option<String> {
        Some(self.cn(label)).filter(|v| !v.is_empty())
    }

    /// English-label lookup returning `None` for an empty value.
    fn en_opt(&self, label: &str) -> Option<String> {
        Some(self.en(label)).filter(|v| !v.is_empty())
    }
}

/// Parses a trial detail page into the full structured record.
///
/// Conditional sections follow the marker-field rule: `ethics_info` requires
/// a non-empty approval status, `recruitment_info` a non-empty recruitment
/// status, `interventions` at least one non-empty group. Absent sections are
/// omitted, never emitted empty.
pub fn parse_trial_detail(html: &str) -> Result<TrialDetail> {
    let document = Html::parse_document(html);
    let index = LabelIndex::build(&document)?;

    let basic_info = BasicInfo {
        registration_number: index.cn("注册号："),
        title: index.cn("注册题目："),
        title_en: index.en("Public title："),
        scientific_title: index.cn("研究课题的正式科学名称："),
        scientific_title_en: index.en("Scientific title："),
        registration_status: index.cn("注册号状态："),
        registration_status_en: index.en("Registration Status："),
        registration_date: index.cn("注册时间："),
        last_update_date: index.cn("最近更新日期："),
    };

    let contact_info = ContactInfo {
        applicant: index.cn("申请注册联系人："),
        applicant_en: index.en("Applicant："),
        study_leader: index.cn("研究负责人："),
        study_leader_en: index.en("Study leader："),
        applicant_phone: index.cn_opt("申请注册联系人电话："),
        study_leader_phone: index.cn_opt("研究负责人电话："),
        applicant_email: index.cn_opt("申请注册联系人电子邮件："),
        study_leader_email: index.cn_opt("研究负责人电子邮件："),
        applicant_institution: index.cn("申请人所在单位："),
        applicant_institution_en: index.en("Applicant's institution："),
        leader_institution: index.cn("研究负责人所在单位："),
        leader_institution_en: index.en("Affiliation of the Leader："),
    };

    let ethics_approved = index.cn("是否获伦理委员会批准：");
    let ethics_info = if ethics_approved.is_empty() {
        None
    } else {
        Some(EthicsInfo {
            approved: ethics_approved,
            committee_name: index.cn("批准本研究的伦理委员会名称："),
            committee_name_en: index.en("Name of the ethic committee："),
            approval_number: index.cn_opt("伦理委员会批件文号："),
            approval_date: index.cn_opt("伦理委员会批准日期："),
        })
    };

    let study_info = StudyInfo {
        disease: index.cn("研究疾病："),
        disease_en: index.en("Target disease："),
        study_type: index.cn("研究类型："),
        study_type_en: index.en("Study type："),
        study_phase: index.cn_opt("研究所处阶段："),
        study_phase_en: index.en_opt("Study phase："),
        study_design: index.cn_opt("研究设计："),
        study_design_en: index.en_opt("Study design："),
        objectives: index.cn("研究目的："),
        objectives_en: index.en("Objectives of Study："),
    };

    let sponsor_info = SponsorInfo {
        primary_sponsor: index.cn("研究实施负责（组长）单位："),
        primary_sponsor_en: index.en("Primary sponsor："),
        funding_source: index.cn_opt("经费或物资来源："),
        funding_source_en: index.en_opt("Source(s) of funding："),
    };

    let recruitment_status = index.cn("征募研究对象情况：");
    let recruitment_info = if recruitment_status.is_empty() {
        None
    } else {
        Some(RecruitmentInfo {
            recruitment_status,
            study_start_date: index.cn_opt("研究实施时间(开始)"),
            study_end_date: index.cn_opt("研究实施时间(结束)"),
        })
    };

    let interventions = parse_interventions(&document)?;

    Ok(TrialDetail {
        basic_info,
        contact_info,
        ethics_info,
        study_info,
        sponsor_info,
        recruitment_info,
        interventions: if interventions.is_empty() {
            None
        } else {
            Some(interventions)
        },
        inclusion_criteria: index.cn_opt("纳入标准："),
        inclusion_criteria_en: index.en_opt("Inclusion criteria"),
        exclusion_criteria: index.cn_opt("排除标准："),
        exclusion_criteria_en: index.en_opt("Exclusion criteria："),
    })
}

/// Extracts the repeated intervention-group sub-structure.
///
/// The container is the table whose header label mentions 干预措施; inside it
/// each group lives in its own nested `table.noComma`, as label/value cell
/// pairs read left to right.
fn parse_interventions(document: &Html) -> Result<Vec<Intervention>> {
    let table_sel = selector("table")?;
    let left_title_sel = selector(".left_title")?;
    let group_table_sel = selector("table.noComma")?;
    let row_sel = selector("tr")?;
    let cell_sel = selector("td")?;

    let mut interventions = Vec::new();

    for table in document.select(&table_sel) {
        let is_container = table
            .select(&left_title_sel)
            .any(|el| text_of(el).contains("干预措施"));
        if !is_container {
            continue;
        }

        for group_table in table.select(&group_table_sel) {
            let mut group = Intervention::default();

            for row in group_table.select(&row_sel) {
                let cells: Vec<ElementRef> = row.select(&cell_sel).collect();
                for pair in cells.windows(2) {
                    let label = text_of(pair[0]);
                    let value = || text_of(pair[1]);
                    if label.contains("组别：") {
                        group.group = value();
                    } else if label.contains("Group：") {
                        group.group_en = value();
                    } else if label.contains("样本量：") {
                        group.sample_size = value();
                    } else if label.contains("Sample size：") {
                        // English node is a fallback only.
                        if group.sample_size.is_empty() {
                            group.sample_size = value();
                        }
                    } else if label.contains("干预措施：") {
                        group.intervention = value();
                    } else if label.contains("Intervention：") {
                        group.intervention_en = value();
                    }
                }
            }

            if !group.group.is_empty() || !group.intervention.is_empty() {
                interventions.push(group);
            }
        }

        // The container's nested tables were already walked; scanning the
        // nested tables again as outer matches would duplicate groups.
        break;
    }

    Ok(interventions)
}
