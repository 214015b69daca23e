use crate::history::ClusterGraph;

use super::super::ViewModel;

impl ViewModel {
    /// Rebuilds the cluster graph from the current settings. The running
    /// simulation is stopped first and reset onto the new node set.
    pub(in crate::app) fn rebuild_cluster_graph(&mut self) {
        self.simulation.stop();

        self.graph = ClusterGraph::build(&self.history.clusters, self.graph_config);
        self.graph_revision = self.graph_revision.wrapping_add(1);
        self.search_match_cache = None;
        self.view_scratch.draw_order_dirty = true;
        self.simulation.reset(&self.graph);

        if let Some(selected) = self.selected
            && self.graph.index_of(selected).is_none()
        {
            self.set_selected(None);
        }

        self.visible_node_count = self.graph.node_count();
        self.visible_edge_count = self.graph.edge_count();
        self.graph_dirty = false;
    }

    /// Restarts the layout on the current graph without rebuilding it.
    pub(in crate::app) fn restart_layout(&mut self) {
        self.simulation.stop();
        self.simulation.reset(&self.graph);
    }

    pub(in crate::app) fn apply_layout_config(&mut self) {
        if self.simulation.config() != self.layout_config {
            self.simulation.set_config(self.layout_config);
        }
    }
}
