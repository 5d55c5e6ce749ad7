/// Per-column standardization (zero mean, unit population variance).
/// Constant columns are centered but not scaled.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    means: Vec<f64>,
    scales: Vec<f64>,
}

impl StandardScaler {
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map_or(0, Vec::len);
        let n = rows.len().max(1) as f64;

        let means: Vec<f64> = (0..width)
            .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n)
            .collect();
        let scales = (0..width)
            .map(|c| {
                let var = rows.iter().map(|r| (r[c] - means[c]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();

        Self { means, scales }
    }

    pub fn transform(&self, rows: &mut [Vec<f64>]) {
        for row in rows {
            for (c, v) in row.iter_mut().enumerate() {
                *v = (*v - self.means[c]) / self.scales[c];
            }
        }
    }

    pub fn fit_transform(rows: &mut [Vec<f64>]) -> Self {
        let scaler = Self::fit(rows);
        scaler.transform(rows);
        scaler
    }
}
